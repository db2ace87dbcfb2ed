//! Text lines the core pushes to clients

use chrono::Local;

/// Notice sent to subscribers when a room is registered
pub const ROOM_CREATED_NOTICE: &str = "A new room is created, please refresh chatroom table.";

/// Notice sent to subscribers when a room is unregistered
pub const ROOM_DESTROYED_NOTICE: &str = "A room has been destroyed, please refresh chatroom table.";

/// Notice sent to subscribers when a quitting creator's rooms are reaped
pub const CREATOR_OFFLINE_NOTICE: &str =
    "A room creator goes off line, please refresh chatroom table!";

/// Notice sent to a sender whose direct-message receiver is not in the room
pub const RECEIVER_ABSENT_NOTICE: &str = "participant not exist!";

/// Current local time rendered with a strftime pattern
pub fn timestamp(format: &str) -> String {
    Local::now().format(format).to_string()
}

pub fn join_line(timestamp: &str, client_id: &str) -> String {
    format!("{}  {} enters the room.", timestamp, client_id)
}

pub fn leave_line(timestamp: &str, client_id: &str) -> String {
    format!("{}  {} leaves the room.", timestamp, client_id)
}

/// Chat line; an empty `receiver` means everyone
pub fn chat_line(timestamp: &str, sender: &str, receiver: &str, text: &str) -> String {
    if receiver.is_empty() {
        format!("{}\n{} to all: {}", timestamp, sender, text)
    } else {
        format!("{}\n{} to {}: {}", timestamp, sender, receiver, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_lines() {
        assert_eq!(join_line("12:00", "bob"), "12:00  bob enters the room.");
        assert_eq!(leave_line("12:01", "bob"), "12:01  bob leaves the room.");
    }

    #[test]
    fn test_chat_line() {
        assert_eq!(chat_line("t", "alice", "", "hi"), "t\nalice to all: hi");
        assert_eq!(chat_line("t", "alice", "bob", "hi"), "t\nalice to bob: hi");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp("%Y");
        assert_eq!(ts.len(), 4);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }
}
