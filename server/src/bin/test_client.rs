//! Minimal headless wire-protocol harness: joins as a new session, starts a
//! round once a second player is presumably present, feeds it a few turns,
//! and prints every `ServerMessage` it receives. Useful for poking a running
//! server by hand; not part of the automated test suite.

use bincode::{deserialize, serialize};
use shared::{ClientMessage, Direction, HelloRequest, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("client socket bound to {}", socket.local_addr()?);

    let server_addr: SocketAddr = "127.0.0.1:8080".parse()?;

    let join = ClientMessage::Join(HelloRequest::NewSession {
        username: "test_client".to_string(),
        color: (0.2, 0.8, 0.4),
    });
    send(&socket, server_addr, &join).await?;

    let mut buf = [0u8; 2048];
    let session_id = loop {
        let (len, _) = socket.recv_from(&mut buf).await?;
        match deserialize::<ServerMessage>(&buf[..len])? {
            ServerMessage::Session(id) => {
                println!("received session {}", id);
                break id;
            }
            other => println!("(waiting for session) got {:?}", other),
        }
    };
    let _ = session_id;

    send(&socket, server_addr, &ClientMessage::Start).await?;

    let turns = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];
    for turn in turns {
        sleep(Duration::from_millis(250)).await;
        send(&socket, server_addr, &ClientMessage::Input(turn)).await?;
        println!("sent input {:?}", turn);
    }

    for _ in 0..20 {
        let (len, _) = socket.recv_from(&mut buf).await?;
        let message: ServerMessage = deserialize(&buf[..len])?;
        println!("received {:?}", message);
    }

    send(&socket, server_addr, &ClientMessage::Disconnect).await?;
    println!("test client finished");
    Ok(())
}

async fn send(socket: &UdpSocket, addr: SocketAddr, message: &ClientMessage) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = serialize(message)?;
    socket.send_to(&bytes, addr).await?;
    Ok(())
}
