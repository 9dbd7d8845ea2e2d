use crate::controller::Command;
use crate::error::ProtocolError;
use bytes::BufMut;
use tokio_util::codec::Encoder;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CommandEncoder;

impl Encoder<Command> for CommandEncoder {
    type Error = ProtocolError;

    fn encode(&mut self, item: Command, dst: &mut bytes::BytesMut) -> Result<(), Self::Error> {
        let payload = item.payload();
        dst.put_u8((1 + payload.len()) as u8);
        dst.put_u8(item.msg_type());
        dst.put_slice(&payload);
        Ok(())
    }
}
