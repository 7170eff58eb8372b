// keygate — Access Module
//
// Access-control policies attached to stored records and the device state
// they are evaluated against.

mod policy;

pub use policy::{AccessControl, Accessibility, AuthRequirement, Availability, DeviceState};
