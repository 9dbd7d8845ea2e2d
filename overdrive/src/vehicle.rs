use crate::error::{Error, Result};
use crate::lane::Lane;
use crate::scanner::TrackMap;
use crate::transport::{VehicleLink, READ_CHARACTERISTIC_UUID, WRITE_CHARACTERISTIC_UUID};
use bytes::Bytes;
use overdrive_codecs::battery::BatteryState;
use overdrive_codecs::controller::Command;
use overdrive_codecs::error::ProtocolError;
use overdrive_codecs::packet::Packet;
use overdrive_codecs::track::{TrackPiece, TrackPieceType};
use overdrive_codecs::vehicle::Notification;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

pub const DEFAULT_ACCELERATION: u16 = 500;
pub const ALIGN_SPEED: u16 = 300;
const STOP_DECELERATION: u16 = 600;
const SDK_MODE_FLAGS: u8 = 0x01;
const EVENT_CAPACITY: usize = 64;

/// Events fanned out to session subscribers, in notification arrival order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleEvent {
    /// The vehicle crossed onto a new piece. Carries the piece it is now on
    /// when a map and position are known, otherwise the last raw decode.
    TrackPieceChange(Option<TrackPiece>),
    Delocalized,
    Pong,
    Disconnected,
}

#[derive(Debug, Default)]
struct State {
    connected: bool,
    current_piece: Option<TrackPiece>,
    position: Option<usize>,
    road_offset: Option<f32>,
    speed: u16,
    battery: Option<BatteryState>,
    map: Option<TrackMap>,
}

struct Inner {
    state: Mutex<State>,
    link: tokio::sync::Mutex<Box<dyn VehicleLink>>,
    events: broadcast::Sender<VehicleEvent>,
}

/// Handle to one connected vehicle. Clones share the same session; a session
/// is created fresh per connection attempt and dies with the connection.
#[derive(Clone)]
pub struct Vehicle {
    id: u16,
    inner: Arc<Inner>,
}

impl fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vehicle")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Vehicle {
    /// Turn an open transport link into a live session: enable SDK mode,
    /// subscribe to telemetry and start the notification task.
    pub(crate) async fn connect(
        id: u16,
        mut link: Box<dyn VehicleLink>,
        map: Option<TrackMap>,
        departed: mpsc::UnboundedSender<u16>,
    ) -> Result<Self> {
        let enable_sdk = Command::SetSdkMode {
            enabled: true,
            flags: SDK_MODE_FLAGS,
        };
        link.write_characteristic(WRITE_CHARACTERISTIC_UUID, &enable_sdk.to_frame())
            .await?;
        let notifications = link.subscribe(READ_CHARACTERISTIC_UUID).await?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                connected: true,
                map,
                ..State::default()
            }),
            link: tokio::sync::Mutex::new(link),
            events,
        });
        tokio::spawn(notification_loop(
            id,
            notifications,
            Arc::clone(&inner),
            departed,
        ));
        Ok(Self { id, inner })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().unwrap().connected
    }

    /// Read-only handle to the shared track map, once a scan published one.
    pub fn map(&self) -> Option<TrackMap> {
        self.inner.state.lock().unwrap().map.clone()
    }

    /// Index into the shared map, valid once alignment or a scan completed.
    pub fn position(&self) -> Option<usize> {
        self.inner.state.lock().unwrap().position
    }

    /// Signed distance from the lane centre in mm, from the last telemetry.
    pub fn road_offset(&self) -> Option<f32> {
        self.inner.state.lock().unwrap().road_offset
    }

    /// Last commanded (or telemetry-reported) speed in mm/s.
    pub fn speed(&self) -> u16 {
        self.inner.state.lock().unwrap().speed
    }

    pub fn battery(&self) -> Option<BatteryState> {
        self.inner.state.lock().unwrap().battery
    }

    /// The piece the vehicle is on according to map and position. `None`
    /// until both are known.
    pub fn current_track_piece(&self) -> Option<TrackPiece> {
        let state = self.inner.state.lock().unwrap();
        let map = state.map.as_ref()?;
        map.get(state.position?).copied()
    }

    /// Closest discrete lane for the last known road offset.
    pub fn lane<L: Lane>(&self) -> Option<L> {
        self.road_offset().map(L::closest)
    }

    /// Subscribe to session events. The receiver is the subscription handle;
    /// dropping it unsubscribes.
    pub fn events(&self) -> broadcast::Receiver<VehicleEvent> {
        self.inner.events.subscribe()
    }

    /// Wait for the next track piece crossing and return the piece the
    /// vehicle is then on (still `None` before a scan).
    pub async fn wait_for_track_change(&self) -> Result<Option<TrackPiece>> {
        let mut events = self.events();
        loop {
            match events.recv().await {
                Ok(VehicleEvent::TrackPieceChange(piece)) => return Ok(piece),
                Ok(VehicleEvent::Disconnected) => return Err(Error::Disconnected),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Vehicle {} event reader lagged by {skipped}", self.id);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::Disconnected),
            }
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        let frame = command.to_frame();
        let mut link = self.inner.link.lock().await;
        link.write_characteristic(WRITE_CHARACTERISTIC_UUID, &frame)
            .await?;
        Ok(())
    }

    /// Set the vehicle speed in mm/s. Commands are fire-and-forget; the
    /// vehicle sends no acknowledgment.
    pub async fn set_speed(&self, speed: u16, acceleration: u16) -> Result<()> {
        self.send(Command::SetSpeed {
            speed: speed as i16,
            acceleration: acceleration as i16,
        })
        .await?;
        self.inner.state.lock().unwrap().speed = speed;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.set_speed(0, STOP_DECELERATION).await
    }

    pub async fn change_lane<L: Lane>(
        &self,
        lane: L,
        horizontal_speed: u16,
        horizontal_acceleration: u16,
    ) -> Result<()> {
        self.change_position(lane.offset(), horizontal_speed, horizontal_acceleration)
            .await
    }

    /// Move to an offset from the track centre line in mm.
    pub async fn change_position(
        &self,
        road_center_offset: f32,
        horizontal_speed: u16,
        horizontal_acceleration: u16,
    ) -> Result<()> {
        self.send(Command::ChangeLane {
            horizontal_speed,
            horizontal_acceleration,
            road_center_offset,
            hop_intent: 0,
            tag: 0,
        })
        .await
    }

    pub async fn cancel_lane_change(&self) -> Result<()> {
        self.send(Command::CancelLaneChange).await
    }

    /// Turn the vehicle around. Does not work reliably on real hardware.
    pub async fn turn(&self) -> Result<()> {
        self.send(Command::Turn {
            turn_type: 3,
            trigger: 0,
        })
        .await
    }

    /// Probe liveness. Real vehicles never answer, so this is a no-op
    /// liveness check unless the firmware ever grows a pong.
    pub async fn ping(&self) -> Result<()> {
        self.send(Command::Ping).await
    }

    pub async fn request_version(&self) -> Result<()> {
        self.send(Command::VersionRequest).await
    }

    /// The light mask command is broken in the vehicle computer; refuse it
    /// instead of pretending the send had effect.
    pub async fn set_lights(&self, _mask: u8) -> Result<()> {
        Err(Error::Unsupported("set_lights"))
    }

    /// See [`Vehicle::set_lights`].
    pub async fn light_pattern(&self, _red: u8, _green: u8, _blue: u8) -> Result<()> {
        Err(Error::Unsupported("light_pattern"))
    }

    /// Drive until the piece just left is `target_previous`. Leaving a
    /// FINISH piece puts the vehicle on START, i.e. logical position 0; this
    /// is the only way a session gains a position before a map exists. No
    /// internal timeout: the right bound depends on track length and speed,
    /// so callers wrap this in their own deadline.
    pub async fn align(&self, target_previous: TrackPieceType) -> Result<()> {
        let mut events = self.events();
        self.set_speed(ALIGN_SPEED, DEFAULT_ACCELERATION).await?;
        loop {
            match events.recv().await {
                Ok(VehicleEvent::TrackPieceChange(_)) => {
                    // telemetry for the new piece has not arrived yet, so the
                    // last decoded piece is the one just left
                    let previous = self.inner.state.lock().unwrap().current_piece;
                    if previous.is_some_and(|piece| piece.piece_type == target_previous) {
                        break;
                    }
                }
                Ok(VehicleEvent::Disconnected) => return Err(Error::Disconnected),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Vehicle {} event reader lagged by {skipped}", self.id);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::Disconnected),
            }
        }
        self.inner.state.lock().unwrap().position = Some(0);
        self.stop().await
    }

    /// Close the transport connection. The notification task notices the
    /// stream ending and handles fleet removal.
    pub async fn disconnect(&self) -> Result<()> {
        let disconnected = {
            let mut link = self.inner.link.lock().await;
            link.disconnect().await?
        };
        if !disconnected {
            return Err(Error::DisconnectFailed);
        }
        self.inner.state.lock().unwrap().connected = false;
        Ok(())
    }

    pub(crate) fn publish_map(&self, map: TrackMap) {
        self.inner.state.lock().unwrap().map = Some(map);
    }

    pub(crate) fn set_position(&self, position: usize) {
        self.inner.state.lock().unwrap().position = Some(position);
    }
}

async fn notification_loop(
    id: u16,
    mut notifications: mpsc::Receiver<Bytes>,
    inner: Arc<Inner>,
    departed: mpsc::UnboundedSender<u16>,
) {
    while let Some(frame) = notifications.recv().await {
        let packet = match Packet::from_frame(&frame) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!("Discarding frame from vehicle {id}: {error}");
                continue;
            }
        };
        match Notification::from_packet(&packet) {
            Ok(notification) => handle_notification(id, notification, &inner),
            Err(ProtocolError::UnrecognizedMessage(msg_type)) => {
                tracing::trace!("Ignoring message 0x{msg_type:02x} from vehicle {id}");
            }
            Err(error) => {
                tracing::warn!("Undecodable notification from vehicle {id}: {error}");
            }
        }
    }
    tracing::info!("Notification stream for vehicle {id} ended");
    inner.state.lock().unwrap().connected = false;
    let _ = inner.events.send(VehicleEvent::Disconnected);
    let _ = departed.send(id);
}

fn handle_notification(id: u16, notification: Notification, inner: &Inner) {
    match notification {
        Notification::TrackPieceUpdate(update) => {
            let mut state = inner.state.lock().unwrap();
            state.road_offset = Some(update.road_offset);
            state.speed = update.speed;
            match update.piece() {
                Ok(piece) => state.current_piece = Some(piece),
                Err(error) => {
                    // recoverable: keep the previous piece, but say so loudly
                    // since an in-progress scan may now be invalid
                    tracing::warn!("Vehicle {id} sent an undecodable track piece: {error}");
                }
            }
        }
        Notification::TrackPieceChange => {
            let piece = {
                let mut state = inner.state.lock().unwrap();
                match (state.position, state.map.as_ref()) {
                    (Some(position), Some(map)) => {
                        let next = (position + 1) % map.len();
                        let piece = map.get(next).copied();
                        state.position = Some(next);
                        piece
                    }
                    _ => state.current_piece,
                }
            };
            let _ = inner.events.send(VehicleEvent::TrackPieceChange(piece));
        }
        Notification::ChargerInfo(battery) => {
            inner.state.lock().unwrap().battery = Some(battery);
        }
        Notification::Delocalized => {
            tracing::warn!("Vehicle {id} lost confidence in its track position");
            let _ = inner.events.send(VehicleEvent::Delocalized);
        }
        Notification::Pong => {
            let _ = inner.events.send(VehicleEvent::Pong);
        }
        Notification::VersionResponse(version) => {
            tracing::debug!("Vehicle {id} reports firmware version {version}");
        }
    }
}
