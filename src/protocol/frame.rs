/// Wire formats exchanged with the browser terminal.
///
/// Binary frames carry data: `[cmd][payload]` where `cmd` is
/// [`CMD_INPUT`] (payload forwarded verbatim to the shell) or
/// [`CMD_RESIZE`] (payload is `rows:u16be ++ cols:u16be`).
/// Text frames carry JSON control messages tagged by `method`.
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::pty::WindowSize;

pub const CMD_INPUT: u8 = 0x00;
pub const CMD_RESIZE: u8 = 0x01;

const RESIZE_PAYLOAD_LEN: usize = 4;

/// A decoded binary frame from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Input(Bytes),
    Resize(WindowSize),
}

impl ClientFrame {
    /// Decode a binary frame. Empty frames, unknown commands and resize frames
    /// with a payload other than four bytes yield `None`.
    pub fn decode(frame: &Bytes) -> Option<Self> {
        let (&cmd, payload) = frame.split_first()?;
        match cmd {
            CMD_INPUT => Some(ClientFrame::Input(frame.slice(1..))),
            CMD_RESIZE if payload.len() == RESIZE_PAYLOAD_LEN => {
                let rows = u16::from_be_bytes([payload[0], payload[1]]);
                let cols = u16::from_be_bytes([payload[2], payload[3]]);
                Some(ClientFrame::Resize(WindowSize { rows, cols }))
            }
            _ => None,
        }
    }

    pub fn encode(&self) -> Bytes {
        match self {
            ClientFrame::Input(data) => {
                let mut buf = BytesMut::with_capacity(1 + data.len());
                buf.put_u8(CMD_INPUT);
                buf.put_slice(data);
                buf.freeze()
            }
            ClientFrame::Resize(size) => {
                let mut buf = BytesMut::with_capacity(1 + RESIZE_PAYLOAD_LEN);
                buf.put_u8(CMD_RESIZE);
                buf.put_u16(size.rows);
                buf.put_u16(size.cols);
                buf.freeze()
            }
        }
    }
}

/// JSON control message carried in a text frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Sent once the client terminal is mounted
    Ready { cols: u16, rows: u16 },
    /// Sent on every subsequent client resize
    Resize { rows: u16, cols: u16 },
}

impl ControlMessage {
    pub fn window_size(&self) -> WindowSize {
        match *self {
            ControlMessage::Ready { cols, rows } | ControlMessage::Resize { rows, cols } => {
                WindowSize { rows, cols }
            }
        }
    }
}

/// Structured server-to-client notice sent on the control channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerNotice {
    Error { title: String, message: String },
}

/// Bytes written to the client terminal once the shell has exited
pub fn closing_notification(code: i32) -> Bytes {
    Bytes::from(format!(
        "\r\n\x1b[31mProcess closed with code {code}\x1b[0m\r\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_payload_is_forwarded_verbatim() {
        let frame = Bytes::from_static(b"\x00echo hi\n\x00\xff");
        assert_eq!(
            ClientFrame::decode(&frame),
            Some(ClientFrame::Input(Bytes::from_static(b"echo hi\n\x00\xff")))
        );
    }

    #[test]
    fn input_with_empty_payload_is_still_input() {
        let frame = Bytes::from_static(&[CMD_INPUT]);
        assert_eq!(
            ClientFrame::decode(&frame),
            Some(ClientFrame::Input(Bytes::new()))
        );
    }

    #[test]
    fn resize_decodes_rows_then_cols() {
        let frame = Bytes::from_static(&[CMD_RESIZE, 0x00, 0x1E, 0x00, 0x64]);
        assert_eq!(
            ClientFrame::decode(&frame),
            Some(ClientFrame::Resize(WindowSize { rows: 30, cols: 100 }))
        );
    }

    #[test]
    fn resize_with_wrong_length_is_ignored() {
        let payloads: [&[u8]; 4] = [&[], &[0x00], &[0, 30, 0], &[0, 30, 0, 100, 0]];
        for payload in payloads {
            let mut frame = vec![CMD_RESIZE];
            frame.extend_from_slice(payload);
            assert_eq!(ClientFrame::decode(&Bytes::from(frame)), None);
        }
    }

    #[test]
    fn empty_and_unknown_frames_are_ignored() {
        assert_eq!(ClientFrame::decode(&Bytes::new()), None);
        assert_eq!(ClientFrame::decode(&Bytes::from_static(&[0x07, 1, 2])), None);
    }

    #[test]
    fn encoded_resize_matches_wire_layout() {
        let frame = ClientFrame::Resize(WindowSize { rows: 30, cols: 100 }).encode();
        assert_eq!(&frame[..], &[CMD_RESIZE, 0x00, 0x1E, 0x00, 0x64]);
    }

    #[test]
    fn control_messages_use_named_fields() {
        let ready: ControlMessage =
            serde_json::from_str(r#"{"method":"ready","cols":80,"rows":24}"#).unwrap();
        assert_eq!(ready.window_size(), WindowSize { rows: 24, cols: 80 });

        let resize: ControlMessage =
            serde_json::from_str(r#"{"method":"resize","rows":30,"cols":100}"#).unwrap();
        assert_eq!(resize.window_size(), WindowSize { rows: 30, cols: 100 });

        assert!(serde_json::from_str::<ControlMessage>(r#"{"method":"input"}"#).is_err());
    }

    #[test]
    fn error_notice_shape() {
        let notice = ServerNotice::Error {
            title: "Terminal is unavailable".to_string(),
            message: "boom".to_string(),
        };
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "error",
                "title": "Terminal is unavailable",
                "message": "boom",
            })
        );
    }

    #[test]
    fn closing_notification_is_red_text() {
        assert_eq!(
            &closing_notification(3)[..],
            b"\r\n\x1b[31mProcess closed with code 3\x1b[0m\r\n"
        );
    }
}
