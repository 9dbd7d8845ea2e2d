use crate::error::ProtocolError;
use crate::packet::PacketCodec;
use crate::vehicle::Notification;
use tokio_util::codec::Decoder;

/// Framed view over a notification byte stream. Yields one [`Notification`]
/// per wire frame; opcodes the vehicle never sends are a decode error here
/// (use [`PacketCodec`] to pass unknown packets through instead).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct NotificationDecoder {
    packets: PacketCodec,
}

impl Decoder for NotificationDecoder {
    type Item = Notification;

    type Error = ProtocolError;

    fn decode(&mut self, src: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(packet) = self.packets.decode(src)? else {
            return Ok(None);
        };
        Notification::from_packet(&packet).map(Some)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::battery::BatteryState;
    use bytes::BytesMut;

    #[test]
    fn example() {
        let mut input = BytesMut::from(&[0x05, 0x3f, 0x00, 0x01, 0x01, 0x00][..]);

        let mut decoder = NotificationDecoder::default();
        let first = decoder.decode(&mut BytesMut::from(&input[0..3][..]));
        assert!(matches!(first, Ok(None)));

        let second = decoder.decode(&mut input).unwrap().unwrap();
        let expected =
            Notification::ChargerInfo(BatteryState::from_charger_info(false, true, true));
        assert_eq!(expected, second);
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let mut input = BytesMut::from(&[0x01, 0x42][..]);
        let mut decoder = NotificationDecoder::default();
        assert!(matches!(
            decoder.decode(&mut input),
            Err(ProtocolError::UnrecognizedMessage(0x42))
        ));
    }

    #[test]
    fn several_frames_in_one_buffer() {
        let mut input = BytesMut::from(&[0x01, 0x29, 0x01, 0x2b, 0x01, 0x29][..]);
        let mut decoder = NotificationDecoder::default();
        assert_eq!(
            decoder.decode(&mut input).unwrap().unwrap(),
            Notification::TrackPieceChange
        );
        assert_eq!(
            decoder.decode(&mut input).unwrap().unwrap(),
            Notification::Delocalized
        );
        assert_eq!(
            decoder.decode(&mut input).unwrap().unwrap(),
            Notification::TrackPieceChange
        );
        assert!(matches!(decoder.decode(&mut input), Ok(None)));
    }
}
