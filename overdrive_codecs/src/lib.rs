pub mod advertisement;
pub mod battery;
pub mod controller;
pub mod error;
pub mod packet;
pub mod track;
pub mod vehicle;

pub type Speed = u16;
pub type RoadOffset = f32;
pub type FirmwareVersion = u16;

/// Longest payload a single packet may carry, in bytes.
pub const MAX_PAYLOAD: usize = 18;

pub const SERVICE_UUID: &str = "be15beef-6186-407e-8381-0bd89c4d8df4";
pub const READ_CHARACTERISTIC_UUID: &str = "be15bee0-6186-407e-8381-0bd89c4d8df4";
pub const WRITE_CHARACTERISTIC_UUID: &str = "be15bee1-6186-407e-8381-0bd89c4d8df4";

#[cfg(test)]
mod test {
    use crate::battery::BatteryState;
    use crate::track::TrackPieceType;
    use crate::vehicle::{decoder::NotificationDecoder, Notification};
    use futures::StreamExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn codec_example() {
        let notify_stream = Builder::new()
            .read(&[
                0x0a, 0x27, 0x28, 0x27, 0x00, 0x00, 0xbc, 0x41, 0x2c, 0x01, 0x10,
            ])
            .read(&[0x01, 0x29])
            .read(&[0x05, 0x3f, 0x01, 0x01, 0x00, 0x00])
            .build();
        let mut notify_stream =
            tokio_util::codec::FramedRead::new(notify_stream, NotificationDecoder::default());

        let update = notify_stream.next().await.unwrap().unwrap();
        let Notification::TrackPieceUpdate(update) = update else {
            panic!("expected a track piece update, got {update:?}");
        };
        assert_eq!(update.loc, 40);
        assert_eq!(update.piece_code, 39);
        assert_eq!(update.road_offset, 23.5);
        assert_eq!(update.speed, 300);
        assert_eq!(update.clockwise_raw, 16);
        assert_eq!(update.piece().unwrap().piece_type, TrackPieceType::Straight);

        assert_eq!(
            notify_stream.next().await.unwrap().unwrap(),
            Notification::TrackPieceChange
        );

        assert_eq!(
            notify_stream.next().await.unwrap().unwrap(),
            Notification::ChargerInfo(BatteryState::from_charger_info(true, true, false))
        );
    }
}
