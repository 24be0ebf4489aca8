use std::time::Duration;

use tracing::debug;

use crate::{NavflowError, Result, common::MemCache, utils};

const MAX_LOCKED_DEVICES: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
struct LockHolder {
    owner: String,
    acquired_at: i64,
}

/// Exclusive device control with bounded lifetime.
///
/// A lock expires `ttl` after it was taken, so a leaked lease cannot block a device
/// forever. Acquisition never waits: a held device fails with `DeviceBusy`.
#[derive(Clone)]
pub struct DeviceLocks {
    holders: MemCache<String, LockHolder>,
}

impl DeviceLocks {
    pub fn new(ttl: Duration) -> Self {
        Self {
            holders: MemCache::with_ttl(MAX_LOCKED_DEVICES, ttl),
        }
    }

    /// Takes the lock of `device_id` for `owner`.
    pub fn acquire(
        &self,
        device_id: &str,
        owner: &str,
    ) -> Result<DeviceLease> {
        let holder = LockHolder {
            owner: owner.to_string(),
            acquired_at: utils::time::time_millis(),
        };

        match self.holders.insert_if_absent(device_id.to_string(), holder) {
            None => {
                debug!("device {} locked by {}", device_id, owner);
                Ok(DeviceLease {
                    device_id: device_id.to_string(),
                    owner: owner.to_string(),
                    locks: self.clone(),
                })
            }
            Some(current) => Err(NavflowError::DeviceBusy {
                device_id: device_id.to_string(),
                owner: current.owner,
            }),
        }
    }

    /// Current owner of the device lock.
    pub fn owner(
        &self,
        device_id: &str,
    ) -> Option<String> {
        self.holders.get(&device_id.to_string()).map(|holder| holder.owner)
    }

    /// Time the current lock was taken, in epoch milliseconds.
    pub fn locked_since(
        &self,
        device_id: &str,
    ) -> Option<i64> {
        self.holders.get(&device_id.to_string()).map(|holder| holder.acquired_at)
    }

    pub fn is_locked(
        &self,
        device_id: &str,
    ) -> bool {
        self.owner(device_id).is_some()
    }

    fn release(
        &self,
        device_id: &str,
        owner: &str,
    ) -> bool {
        self.holders.remove_if(device_id.to_string(), |holder| holder.owner == owner)
    }
}

/// Held device lock; released on drop.
///
/// Dropping only releases the lock while this lease still owns it. After expiry the
/// device may have been re-acquired by someone else, whose lock is left untouched.
pub struct DeviceLease {
    device_id: String,
    owner: String,
    locks: DeviceLocks,
}

impl DeviceLease {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if self.locks.release(&self.device_id, &self.owner) {
            debug!("device {} released by {}", self.device_id, self.owner);
        }
    }
}

impl std::fmt::Debug for DeviceLease {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DeviceLease").field("device_id", &self.device_id).field("owner", &self.owner).finish()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::NavflowError;

    use super::DeviceLocks;

    #[test]
    fn test_lease_is_exclusive_and_released_on_drop() {
        let locks = DeviceLocks::new(Duration::from_secs(60));
        let lease = locks.acquire("stb-1", "run-a").unwrap();
        assert_eq!(lease.device_id(), "stb-1");
        assert!(locks.locked_since("stb-1").is_some());

        match locks.acquire("stb-1", "run-b") {
            Err(NavflowError::DeviceBusy {
                device_id,
                owner,
            }) => {
                assert_eq!(device_id, "stb-1");
                assert_eq!(owner, "run-a");
            }
            other => panic!("expected busy device, got {:?}", other),
        }
        assert!(locks.acquire("stb-2", "run-b").is_ok());

        drop(lease);
        assert!(!locks.is_locked("stb-1"));
        assert!(locks.acquire("stb-1", "run-b").is_ok());
    }

    #[test]
    fn test_expired_lease_does_not_release_new_owner() {
        let locks = DeviceLocks::new(Duration::from_millis(30));
        let stale = locks.acquire("stb-1", "run-a").unwrap();
        std::thread::sleep(Duration::from_millis(80));

        let fresh = locks.acquire("stb-1", "run-b").unwrap();
        drop(stale);
        assert_eq!(locks.owner("stb-1"), Some("run-b".to_string()));
        drop(fresh);
        assert!(!locks.is_locked("stb-1"));
    }
}
