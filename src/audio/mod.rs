pub mod device;
pub mod pactl;
pub mod stream;

pub use device::{BluetoothEndpoint, CardInfo, DeviceKind, DeviceProfile, SinkVolume};
pub use pactl::Pactl;
pub use stream::{StreamCategory, StreamHandle, StreamInfo};
