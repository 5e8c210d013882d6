//! STOMP framing and the client frames the session sends.

pub mod frame;

pub use frame::{Command, Frame, FrameError};

pub const ACCEPT_VERSION: &str = "1.2";

/// CONNECT with the bearer credential attached. Heart-beats are disabled.
pub fn connect_frame(host: &str, token: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", ACCEPT_VERSION)
        .header("host", host)
        .header("heart-beat", "0,0")
        .header("Authorization", format!("Bearer {token}"))
}

pub fn subscribe_frame(id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
        .header("ack", "auto")
}

pub fn unsubscribe_frame(id: &str) -> Frame {
    Frame::new(Command::Unsubscribe).header("id", id)
}

pub fn send_frame(destination: &str, json_body: String) -> Frame {
    Frame::new(Command::Send)
        .header("destination", destination)
        .header("content-type", "application/json")
        .body(json_body)
}

pub fn disconnect_frame() -> Frame {
    Frame::new(Command::Disconnect)
}
