use crate::error::ProtocolError;
use crate::{controller, vehicle, MAX_PAYLOAD};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// One protocol frame: `size ++ msg_type ++ payload`, where the size byte
/// counts the message type plus the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub msg_type: u8,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(msg_type: u8, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        if !is_message_type(msg_type) {
            return Err(ProtocolError::InvalidMessageType(msg_type));
        }
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidPayload(payload.len()));
        }
        Ok(Self { msg_type, payload })
    }

    /// Strict parse of a single frame, as delivered by one GATT notify.
    /// The declared size must account for every remaining byte.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        let Some((&size, rest)) = frame.split_first() else {
            return Err(ProtocolError::MalformedPacket {
                declared: 0,
                actual: 0,
            });
        };
        let declared = size as usize;
        if declared != rest.len() {
            return Err(ProtocolError::MalformedPacket {
                declared,
                actual: rest.len(),
            });
        }
        let Some((&msg_type, payload)) = rest.split_first() else {
            // a size byte of zero leaves no room for the message type
            return Err(ProtocolError::MalformedPacket {
                declared,
                actual: rest.len(),
            });
        };
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidPayload(payload.len()));
        }
        Ok(Self {
            msg_type,
            payload: Bytes::copy_from_slice(payload),
        })
    }

    pub fn to_frame(&self) -> Bytes {
        let mut frame = BytesMut::with_capacity(2 + self.payload.len());
        frame.put_u8((1 + self.payload.len()) as u8);
        frame.put_u8(self.msg_type);
        frame.put_slice(&self.payload);
        frame.freeze()
    }
}

pub fn is_message_type(msg_type: u8) -> bool {
    controller::is_message_type(msg_type) || vehicle::is_message_type(msg_type)
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PacketCodec;

impl Decoder for PacketCodec {
    type Item = Packet;

    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(&size) = src.first() else {
            return Ok(None);
        };
        let size = size as usize;
        if size == 0 {
            return Err(ProtocolError::MalformedPacket {
                declared: 0,
                actual: 0,
            });
        }
        if size - 1 > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidPayload(size - 1));
        }
        if src.len() < 1 + size {
            return Ok(None);
        }
        src.advance(1);
        let msg_type = src.get_u8();
        let payload = src.split_to(size - 1).freeze();
        Ok(Some(Packet { msg_type, payload }))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidPayload(item.payload.len()));
        }
        dst.put_u8((1 + item.payload.len()) as u8);
        dst.put_u8(item.msg_type);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller;

    #[test]
    fn round_trip() {
        let packet = Packet::new(controller::SET_SPEED, vec![0x2c, 0x01, 0xf4, 0x01]).unwrap();
        let decoded = Packet::from_frame(&packet.to_frame()).unwrap();
        assert_eq!(packet, decoded);
    }

    #[test]
    fn empty_payload_round_trip() {
        let packet = Packet::new(controller::PING, Bytes::new()).unwrap();
        assert_eq!(&packet.to_frame()[..], &[0x01, 0x16]);
        assert_eq!(Packet::from_frame(&packet.to_frame()).unwrap(), packet);
    }

    #[test]
    fn rejects_unknown_message_type() {
        let result = Packet::new(0x42, Bytes::new());
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidMessageType(0x42))
        ));
    }

    #[test]
    fn rejects_oversized_payload() {
        let result = Packet::new(controller::SET_SPEED, vec![0u8; 19]);
        assert!(matches!(result, Err(ProtocolError::InvalidPayload(19))));
    }

    #[test]
    fn size_byte_must_match() {
        // declares 3 bytes but carries 2
        let result = Packet::from_frame(&[0x03, 0x24, 0x00]);
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedPacket {
                declared: 3,
                actual: 2
            })
        ));

        // declares 1 byte but carries 2
        let result = Packet::from_frame(&[0x01, 0x24, 0x00]);
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedPacket {
                declared: 1,
                actual: 2
            })
        ));

        // declares the 19 byte maximum but one byte is missing
        let mut frame = vec![19, 0x24];
        frame.extend_from_slice(&[0u8; 17]);
        assert!(matches!(
            Packet::from_frame(&frame),
            Err(ProtocolError::MalformedPacket {
                declared: 19,
                actual: 18
            })
        ));
    }

    #[test]
    fn size_byte_zero_is_malformed() {
        assert!(matches!(
            Packet::from_frame(&[0x00]),
            Err(ProtocolError::MalformedPacket { .. })
        ));
        assert!(matches!(
            Packet::from_frame(&[]),
            Err(ProtocolError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        // size 20 = msg type plus a 19 byte payload, one over the limit
        let mut frame = vec![20, 0x24];
        frame.extend_from_slice(&[0u8; 19]);
        assert!(matches!(
            Packet::from_frame(&frame),
            Err(ProtocolError::InvalidPayload(19))
        ));
    }

    #[test]
    fn unknown_message_types_pass_through_decode() {
        let packet = Packet::from_frame(&[0x02, 0x42, 0x07]).unwrap();
        assert_eq!(packet.msg_type, 0x42);
        assert_eq!(&packet.payload[..], &[0x07]);
    }

    #[test]
    fn streaming_decode_waits_for_full_frame() {
        let mut decoder = PacketCodec;
        let mut buffer = BytesMut::from(&[0x05, 0x24, 0x2c][..]);
        assert!(matches!(decoder.decode(&mut buffer), Ok(None)));

        buffer.extend_from_slice(&[0x01, 0xf4, 0x01]);
        let packet = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(packet.msg_type, 0x24);
        assert_eq!(&packet.payload[..], &[0x2c, 0x01, 0xf4, 0x01]);
        assert!(buffer.is_empty());
    }
}
