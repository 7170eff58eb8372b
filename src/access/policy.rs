// keygate — Access-control policy
//
// A policy is a pair (accessibility, requirement). Accessibility decides when
// a record is reachable relative to device state; the requirement decides
// which challenge must be passed before its data is released. Policies are
// persisted with the record and never change afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a stored record is reachable, relative to device lock and passcode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    WhenUnlocked,
    WhenUnlockedThisDeviceOnly,
    AfterFirstUnlock,
    AfterFirstUnlockThisDeviceOnly,
    /// Only while a device passcode is enrolled. Records become unreachable
    /// once the passcode is removed.
    WhenPasscodeSetThisDeviceOnly,
}

/// What the device looks like when a request is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub passcode_set: bool,
    pub unlocked: bool,
    pub unlocked_since_boot: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            passcode_set: false,
            unlocked: true,
            unlocked_since_boot: true,
        }
    }
}

/// Result of checking a record's accessibility against the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Reachable later, once the device is unlocked.
    Locked,
    /// Gone for good: the passcode it depended on was removed.
    Invalidated,
}

impl Accessibility {
    /// Records at this level are excluded from backup and sync.
    pub fn is_device_bound(&self) -> bool {
        matches!(
            self,
            Self::WhenUnlockedThisDeviceOnly
                | Self::AfterFirstUnlockThisDeviceOnly
                | Self::WhenPasscodeSetThisDeviceOnly
        )
    }

    /// Whether a record with this accessibility can be created right now.
    pub fn can_add(&self, device: &DeviceState) -> bool {
        match self {
            Self::WhenPasscodeSetThisDeviceOnly => device.passcode_set,
            _ => true,
        }
    }

    pub fn availability(&self, device: &DeviceState) -> Availability {
        match self {
            Self::WhenUnlocked | Self::WhenUnlockedThisDeviceOnly => {
                if device.unlocked {
                    Availability::Available
                } else {
                    Availability::Locked
                }
            }
            Self::AfterFirstUnlock | Self::AfterFirstUnlockThisDeviceOnly => {
                if device.unlocked_since_boot {
                    Availability::Available
                } else {
                    Availability::Locked
                }
            }
            Self::WhenPasscodeSetThisDeviceOnly => {
                if !device.passcode_set {
                    Availability::Invalidated
                } else if device.unlocked {
                    Availability::Available
                } else {
                    Availability::Locked
                }
            }
        }
    }
}

/// The challenge a reader must pass before record data is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    None,
    /// Biometric match, falling back to the device passcode.
    UserPresence,
    BiometryAny,
    DevicePasscode,
}

impl AuthRequirement {
    pub fn requires_authentication(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether a passcode entry satisfies this requirement.
    pub fn accepts_passcode(&self) -> bool {
        matches!(self, Self::UserPresence | Self::DevicePasscode)
    }

    /// Whether an unlock that satisfied `self` also satisfies `other`.
    ///
    /// A `UserPresence` unlock may have been a passcode entry, so it never
    /// stands in for `BiometryAny` or `DevicePasscode`.
    pub fn covers(&self, other: AuthRequirement) -> bool {
        match (*self, other) {
            (_, Self::None) => true,
            (Self::DevicePasscode | Self::BiometryAny, Self::UserPresence) => true,
            (satisfied, wanted) => satisfied == wanted,
        }
    }
}

/// The access-control descriptor attached to a record at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    pub accessibility: Accessibility,
    pub requirement: AuthRequirement,
}

impl AccessControl {
    pub fn new(accessibility: Accessibility, requirement: AuthRequirement) -> Self {
        Self {
            accessibility,
            requirement,
        }
    }

    /// Device-only, passcode required, user presence checked on every read.
    pub fn user_presence() -> Self {
        Self::new(
            Accessibility::WhenPasscodeSetThisDeviceOnly,
            AuthRequirement::UserPresence,
        )
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        Self::new(Accessibility::WhenUnlocked, AuthRequirement::None)
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WhenUnlocked => "when-unlocked",
            Self::WhenUnlockedThisDeviceOnly => "when-unlocked-this-device-only",
            Self::AfterFirstUnlock => "after-first-unlock",
            Self::AfterFirstUnlockThisDeviceOnly => "after-first-unlock-this-device-only",
            Self::WhenPasscodeSetThisDeviceOnly => "when-passcode-set-this-device-only",
        };
        f.write_str(s)
    }
}

impl fmt::Display for AuthRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::UserPresence => "user-presence",
            Self::BiometryAny => "biometry-any",
            Self::DevicePasscode => "device-passcode",
        };
        f.write_str(s)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn device(passcode_set: bool, unlocked: bool) -> DeviceState {
        DeviceState {
            passcode_set,
            unlocked,
            unlocked_since_boot: true,
        }
    }

    #[test]
    fn test_passcode_level_requires_passcode_to_add() {
        let level = Accessibility::WhenPasscodeSetThisDeviceOnly;
        assert!(!level.can_add(&device(false, true)));
        assert!(level.can_add(&device(true, true)));
        assert!(Accessibility::WhenUnlocked.can_add(&device(false, true)));
    }

    #[test]
    fn test_passcode_removal_invalidates_records() {
        let level = Accessibility::WhenPasscodeSetThisDeviceOnly;
        assert_eq!(level.availability(&device(false, true)), Availability::Invalidated);
        assert_eq!(level.availability(&device(true, false)), Availability::Locked);
        assert_eq!(level.availability(&device(true, true)), Availability::Available);
    }

    #[test]
    fn test_after_first_unlock_survives_lock() {
        let level = Accessibility::AfterFirstUnlock;
        assert_eq!(level.availability(&device(false, false)), Availability::Available);

        let cold = DeviceState {
            passcode_set: true,
            unlocked: false,
            unlocked_since_boot: false,
        };
        assert_eq!(level.availability(&cold), Availability::Locked);
    }

    #[test]
    fn test_device_bound_levels() {
        assert!(Accessibility::WhenPasscodeSetThisDeviceOnly.is_device_bound());
        assert!(Accessibility::WhenUnlockedThisDeviceOnly.is_device_bound());
        assert!(!Accessibility::WhenUnlocked.is_device_bound());
        assert!(!Accessibility::AfterFirstUnlock.is_device_bound());
    }

    #[test]
    fn test_requirement_flags() {
        assert!(!AuthRequirement::None.requires_authentication());
        assert!(AuthRequirement::UserPresence.requires_authentication());
        assert!(AuthRequirement::UserPresence.accepts_passcode());
        assert!(!AuthRequirement::BiometryAny.accepts_passcode());
    }

    #[test]
    fn test_unlock_coverage() {
        use AuthRequirement::*;
        assert!(UserPresence.covers(UserPresence));
        assert!(UserPresence.covers(None));
        assert!(DevicePasscode.covers(UserPresence));
        assert!(BiometryAny.covers(UserPresence));
        assert!(!UserPresence.covers(BiometryAny));
        assert!(!UserPresence.covers(DevicePasscode));
        assert!(!DevicePasscode.covers(BiometryAny));
        assert!(!None.covers(UserPresence));
    }

    #[test]
    fn test_policy_json_shape() {
        let json = serde_json::to_string(&AccessControl::user_presence()).unwrap();
        assert_eq!(
            json,
            r#"{"accessibility":"when_passcode_set_this_device_only","requirement":"user_presence"}"#
        );
        let back: AccessControl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccessControl::user_presence());
    }
}
