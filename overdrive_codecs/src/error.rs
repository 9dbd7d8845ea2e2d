use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message type 0x{0:02x} is not part of the protocol")]
    InvalidMessageType(u8),

    #[error("payload of {0} bytes exceeds the 18 byte packet limit")]
    InvalidPayload(usize),

    #[error("declared packet size {declared} does not match the {actual} bytes that follow")]
    MalformedPacket { declared: usize, actual: usize },

    #[error("payload for message 0x{msg_type:02x} is {actual} bytes, expected at least {expected}")]
    TruncatedPayload {
        msg_type: u8,
        expected: usize,
        actual: usize,
    },

    #[error("track piece code {0} is not in the piece table")]
    UnknownPieceCode(u8),

    #[error("advertisement could not be decoded: {0}")]
    InvalidAdvertisement(&'static str),

    #[error("message type 0x{0:02x} is not a vehicle notification")]
    UnrecognizedMessage(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
