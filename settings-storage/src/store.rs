//! Policy and power-loss record store
use controller_services::settings::{AccessPolicy, Accumulators};
use controller_services::{error, info, trace, warn};
use embedded_storage::Storage;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::block::{self, Header, BLOCK_SIZE, HEADER_LEN, MAX_PAYLOAD, POLICY_MAGIC, POWER_LOSS_MAGIC};
use crate::{Config, Error};

/// Settings store over a storage device
pub struct SettingsStore<S> {
    storage: S,
    config: Config,
}

impl<S: Storage> SettingsStore<S> {
    /// Create a store, checking that both regions fit on the device
    pub fn new(storage: S, config: Config) -> Result<Self, Error<S::Error>> {
        if !config.fits(storage.capacity()) {
            error!("Settings regions do not fit in {} bytes", storage.capacity());
            return Err(Error::InvalidLayout);
        }

        Ok(Self { storage, config })
    }

    /// Storage layout
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Give back the storage device
    pub fn release(self) -> S {
        self.storage
    }

    /// Load the policy block
    pub fn load(&mut self) -> Result<AccessPolicy, Error<S::Error>> {
        self.read_block(self.config.policy_offset, POLICY_MAGIC)
    }

    /// Save the policy block, then bring the power-loss block in line with its accumulators
    pub fn save(&mut self, policy: &AccessPolicy) -> Result<(), Error<S::Error>> {
        self.write_block(self.config.policy_offset, POLICY_MAGIC, policy)?;
        self.save_power_loss(&policy.vehicle.accumulators)
    }

    /// Load the power-loss block
    pub fn load_power_loss(&mut self) -> Result<Accumulators, Error<S::Error>> {
        self.read_block(self.config.power_loss_offset, POWER_LOSS_MAGIC)
    }

    /// Save the power-loss block, leaving the policy block untouched
    pub fn save_power_loss(&mut self, accumulators: &Accumulators) -> Result<(), Error<S::Error>> {
        self.write_block(self.config.power_loss_offset, POWER_LOSS_MAGIC, accumulators)
    }

    /// Load the policy at boot
    ///
    /// A missing or damaged policy falls back to the factory default. A valid power-loss record
    /// then replaces the accumulators unless its odometer is behind the policy's, which happens
    /// when power is lost between the two writes of [`Self::save`]. Only device errors are
    /// returned.
    pub fn load_or_default(&mut self) -> Result<AccessPolicy, Error<S::Error>> {
        let mut policy = match self.load() {
            Ok(policy) => policy,
            Err(Error::Blank) => {
                info!("No stored policy, using factory defaults");
                AccessPolicy::default()
            }
            Err(e) if e.is_missing_record() => {
                error!("Stored policy unusable, using factory defaults");
                AccessPolicy::default()
            }
            Err(e) => return Err(e),
        };

        match self.load_power_loss() {
            Ok(accumulators) if accumulators.odometer >= policy.vehicle.accumulators.odometer => {
                policy.vehicle.accumulators = accumulators
            }
            Ok(_) => warn!("Power-loss record older than policy, ignored"),
            Err(Error::Blank) => trace!("No power-loss record"),
            Err(e) if e.is_missing_record() => warn!("Power-loss record unusable"),
            Err(e) => return Err(e),
        }

        Ok(policy)
    }

    fn read_block<T: DeserializeOwned>(&mut self, offset: u32, magic: u32) -> Result<T, Error<S::Error>> {
        let mut header = [0u8; HEADER_LEN];
        self.storage.read(offset, &mut header).map_err(Error::Storage)?;
        if block::is_blank(&header) {
            return Err(Error::Blank);
        }

        let header = Header::from_bytes(&header);
        let len = header.validate(magic)?;

        let mut payload = [0u8; MAX_PAYLOAD];
        let payload = &mut payload[..len];
        self.storage
            .read(offset + HEADER_LEN as u32, payload)
            .map_err(Error::Storage)?;

        block::decode(&header, payload)
    }

    fn write_block<T: Serialize>(&mut self, offset: u32, magic: u32, value: &T) -> Result<(), Error<S::Error>> {
        let mut buf = [0u8; BLOCK_SIZE];
        let len = block::encode(magic, value, &mut buf)?;
        let encoded = &buf[..len];

        // Unchanged blocks are not rewritten
        let mut current = [0u8; BLOCK_SIZE];
        let current = &mut current[..len];
        self.storage.read(offset, current).map_err(Error::Storage)?;
        if current == encoded {
            trace!("Block at {} unchanged", offset);
            return Ok(());
        }

        self.storage.write(offset, encoded).map_err(Error::Storage)?;
        trace!("Wrote {} byte block at {}", len, offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_services::access::{AccessControl, Passcode, RestrictionStatus, TrialAllotment};
    use controller_services::Timestamp;
    use embedded_storage::ReadStorage;

    const CAPACITY: usize = 1024;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct DeviceFault;

    struct MemStorage {
        data: [u8; CAPACITY],
        writes: usize,
        fail: bool,
    }

    impl MemStorage {
        fn new() -> Self {
            Self {
                data: [0xFF; CAPACITY],
                writes: 0,
                fail: false,
            }
        }
    }

    impl ReadStorage for MemStorage {
        type Error = DeviceFault;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(DeviceFault);
            }
            let offset = offset as usize;
            bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            CAPACITY
        }
    }

    impl Storage for MemStorage {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(DeviceFault);
            }
            let offset = offset as usize;
            self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
            self.writes += 1;
            Ok(())
        }
    }

    fn store() -> SettingsStore<MemStorage> {
        SettingsStore::new(MemStorage::new(), Config::default()).unwrap()
    }

    fn restricted_policy() -> AccessPolicy {
        let mut control = AccessControl::new(AccessPolicy::default());
        control.set_password(Passcode::new(2580, 4).unwrap());
        control.set_boot_gate(true);
        control.configure_trial(TrialAllotment::new(90, 120.0).unwrap()).unwrap();
        control
            .start_trial(Timestamp::new(2024, 5, 1, 12, 0, 0).unwrap(), 42.0)
            .unwrap();
        control.vehicle_mut().battery.capacity_ah = 35.5;
        control.into_policy()
    }

    #[test]
    fn blank_device_loads_defaults() {
        let mut store = store();
        assert_eq!(store.load(), Err(Error::Blank));
        assert_eq!(store.load_power_loss(), Err(Error::Blank));
        assert_eq!(store.load_or_default(), Ok(AccessPolicy::default()));
    }

    #[test]
    fn restriction_survives_reboot() {
        let policy = restricted_policy();
        let mut store = store();
        store.save(&policy).unwrap();

        let mut store = SettingsStore::new(store.release(), Config::default()).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, policy);

        let control = AccessControl::new(loaded);
        assert_eq!(control.restriction_status(), RestrictionStatus::Active);
        assert!(control.requires_password_at_boot());
    }

    #[test]
    fn repeated_save_does_not_rewrite() {
        let policy = restricted_policy();
        let mut store = store();
        store.save(&policy).unwrap();
        store.save(&policy).unwrap();
        // One policy block and one power-loss block
        assert_eq!(store.release().writes, 2);
    }

    #[test]
    fn power_loss_save_leaves_policy_untouched() {
        let policy = restricted_policy();
        let mut store = store();
        store.save(&policy).unwrap();

        let accumulators = Accumulators {
            battery_used_ah: 3.25,
            battery_used_wh: 160.0,
            odometer: 57.5,
        };
        store.save_power_loss(&accumulators).unwrap();

        assert_eq!(store.load(), Ok(policy));
        let loaded = store.load_or_default().unwrap();
        assert_eq!(loaded.vehicle.accumulators, accumulators);
        assert_eq!(loaded.lock(), policy.lock());
    }

    #[test]
    fn policy_save_supersedes_power_loss_record() {
        let mut store = store();
        store
            .save_power_loss(&Accumulators {
                battery_used_ah: 1.0,
                battery_used_wh: 48.0,
                odometer: 50.0,
            })
            .unwrap();

        let mut policy = restricted_policy();
        policy.vehicle.accumulators = Accumulators {
            battery_used_ah: 2.0,
            battery_used_wh: 96.0,
            odometer: 60.0,
        };
        store.save(&policy).unwrap();

        assert_eq!(store.load_power_loss(), Ok(policy.vehicle.accumulators));
        assert_eq!(store.load_or_default().unwrap().vehicle.accumulators.odometer, 60.0);
    }

    #[test]
    fn stale_power_loss_record_does_not_roll_back_odometer() {
        let mut policy = restricted_policy();
        policy.vehicle.accumulators.odometer = 60.0;

        let mut store = store();
        store.save(&policy).unwrap();

        // Power lost after the policy write, before the power-loss write
        let mut stale = SettingsStore::new(MemStorage::new(), Config::default()).unwrap();
        stale
            .save_power_loss(&Accumulators {
                battery_used_ah: 0.0,
                battery_used_wh: 0.0,
                odometer: 50.0,
            })
            .unwrap();
        let mut storage = store.release();
        let offset = Config::default().power_loss_offset as usize;
        storage.data[offset..offset + BLOCK_SIZE]
            .copy_from_slice(&stale.release().data[offset..offset + BLOCK_SIZE]);

        let mut store = SettingsStore::new(storage, Config::default()).unwrap();
        assert_eq!(store.load_power_loss().unwrap().odometer, 50.0);
        assert_eq!(store.load_or_default(), Ok(policy));
    }

    #[test]
    fn power_loss_overlays_defaults() {
        let accumulators = Accumulators {
            battery_used_ah: 0.5,
            battery_used_wh: 24.0,
            odometer: 1200.0,
        };
        let mut store = store();
        store.save_power_loss(&accumulators).unwrap();

        let loaded = store.load_or_default().unwrap();
        assert_eq!(loaded.vehicle.accumulators, accumulators);
        assert_eq!(loaded.lock(), AccessPolicy::default().lock());
    }

    #[test]
    fn corrupt_policy_falls_back() {
        let mut store = store();
        store.save(&restricted_policy()).unwrap();

        let mut storage = store.release();
        storage.data[HEADER_LEN + 1] ^= 0x80;
        let mut store = SettingsStore::new(storage, Config::default()).unwrap();

        assert_eq!(store.load(), Err(Error::Corrupt));
        assert_eq!(store.load_or_default(), Ok(AccessPolicy::default()));
    }

    #[test]
    fn foreign_and_future_blocks_refused() {
        let mut store = store();
        store.save(&AccessPolicy::default()).unwrap();

        let mut storage = store.release();
        storage.data[0] = 0;
        let mut store = SettingsStore::new(storage, Config::default()).unwrap();
        assert_eq!(store.load(), Err(Error::BadMagic));

        let mut storage = store.release();
        storage.data[0..4].copy_from_slice(b"EVAP");
        storage.data[4] = 2;
        let mut store = SettingsStore::new(storage, Config::default()).unwrap();
        assert_eq!(store.load(), Err(Error::UnsupportedVersion(2)));
    }

    #[test]
    fn policy_block_is_not_a_power_loss_record() {
        let config = Config::default();
        let swapped = Config {
            policy_offset: config.power_loss_offset,
            power_loss_offset: config.policy_offset,
        };

        let mut store = store();
        store.save(&AccessPolicy::default()).unwrap();
        let mut store = SettingsStore::new(store.release(), swapped).unwrap();
        assert_eq!(store.load_power_loss(), Err(Error::BadMagic));
    }

    #[test]
    fn device_errors_propagate() {
        let mut storage = MemStorage::new();
        storage.fail = true;
        let mut store = SettingsStore::new(storage, Config::default()).unwrap();
        assert_eq!(store.load_or_default(), Err(Error::Storage(DeviceFault)));
        assert_eq!(store.save(&AccessPolicy::default()), Err(Error::Storage(DeviceFault)));
    }

    #[test]
    fn layout_must_fit_device() {
        let config = Config {
            policy_offset: 0,
            power_loss_offset: CAPACITY as u32,
        };
        assert!(matches!(
            SettingsStore::new(MemStorage::new(), config),
            Err(Error::InvalidLayout)
        ));
    }
}
