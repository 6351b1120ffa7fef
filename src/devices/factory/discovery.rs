//! Bus discovery
//!
//! Walks every registered builder and every candidate address, probes for the
//! chip, and creates, initializes and records each device found. Individual
//! failures never abort the scan: a candidate whose probe or initialization
//! fails is logged and treated as absent.

use super::builder::DeviceBuilder;
use super::connected::ConnectedDevices;
use super::registry::BuilderRegistry;
use super::FactoryError;
use crate::devices::traits::{BusKind, Device};
use crate::platform::I2cInterface;
use alloc::boxed::Box;
use heapless::Vec;

/// Maximum number of reserved addresses
pub const MAX_RESERVED: usize = 8;

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Bus frequency applied before scanning (`None` leaves the bus as is)
    pub frequency: Option<u32>,
    /// Addresses never probed (e.g. parts driven by other firmware)
    pub reserved: Vec<u8, MAX_RESERVED>,
    /// Check for an address acknowledge before the chip-specific probe
    pub ping_first: bool,
}

impl DiscoveryConfig {
    /// Default configuration: current bus speed, nothing reserved, ping first
    pub const fn new() -> Self {
        Self {
            frequency: None,
            reserved: Vec::new(),
            ping_first: true,
        }
    }

    /// Add a reserved address
    ///
    /// # Errors
    ///
    /// `RegistryFull` if `MAX_RESERVED` addresses are already reserved.
    pub fn reserve(&mut self, address: u8) -> Result<(), FactoryError> {
        if self.reserved.contains(&address) {
            return Ok(());
        }
        self.reserved
            .push(address)
            .map_err(|_| FactoryError::RegistryFull)
    }

    fn is_reserved(&self, address: u8) -> bool {
        self.reserved.contains(&address)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Device factory: builder registry, connected devices and discovery settings
#[derive(Default)]
pub struct DeviceFactory {
    builders: BuilderRegistry,
    connected: ConnectedDevices,
    config: DiscoveryConfig,
}

impl DeviceFactory {
    /// Create an empty factory with default discovery settings
    pub const fn new() -> Self {
        Self {
            builders: BuilderRegistry::new(),
            connected: ConnectedDevices::new(),
            config: DiscoveryConfig::new(),
        }
    }

    /// Create an empty factory with the given discovery settings
    pub fn with_config(config: DiscoveryConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    /// Registered builders
    pub fn builders(&self) -> &BuilderRegistry {
        &self.builders
    }

    /// Registered builders, mutable
    pub fn builders_mut(&mut self) -> &mut BuilderRegistry {
        &mut self.builders
    }

    /// Connected devices
    pub fn connected(&self) -> &ConnectedDevices {
        &self.connected
    }

    /// Connected devices, mutable
    pub fn connected_mut(&mut self) -> &mut ConnectedDevices {
        &mut self.connected
    }

    /// Discovery settings
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discovery settings, mutable
    pub fn config_mut(&mut self) -> &mut DiscoveryConfig {
        &mut self.config
    }

    /// Register a builder
    pub fn register(&mut self, builder: &'static DeviceBuilder) -> Result<usize, FactoryError> {
        self.builders.register(builder)
    }

    /// Add an explicitly constructed device, pruning its autoloaded twin
    pub fn attach(&mut self, device: Box<dyn Device>) -> Result<(), FactoryError> {
        self.connected.attach(device)
    }

    /// Probe the bus for every registered I2C builder
    ///
    /// Builders are visited in registration order, addresses in list order
    /// up to the `NULL_ADDRESS` sentinel. Claimed and reserved addresses
    /// are skipped. Each device found is named after its builder, marked
    /// autoload, initialized and added to the connected list.
    ///
    /// # Returns
    ///
    /// Number of devices created.
    pub fn discover(&mut self, bus: &mut dyn I2cInterface) -> usize {
        if let Some(frequency) = self.config.frequency {
            if let Err(e) = bus.set_frequency(frequency) {
                crate::log_warn!("Bus frequency {} rejected: {:?}", frequency, e);
            }
        }

        let Self {
            builders,
            connected,
            config,
        } = self;

        let mut created = 0;
        for builder in builders.iter() {
            if builder.kind != BusKind::I2c {
                continue;
            }
            for address in builder.candidates() {
                if try_create(connected, config, builder, bus, address) {
                    created += 1;
                }
            }
        }

        crate::log_info!(
            "Discovery complete: {} created, {} connected",
            created,
            connected.len()
        );
        created
    }
}

/// Probe one candidate address and record the device if it is present
fn try_create(
    connected: &mut ConnectedDevices,
    config: &DiscoveryConfig,
    builder: &'static DeviceBuilder,
    bus: &mut dyn I2cInterface,
    address: u8,
) -> bool {
    if connected.is_address_claimed(BusKind::I2c, address) {
        crate::log_trace!("{}: {:#x} already claimed", builder.name, address);
        return false;
    }
    if config.is_reserved(address) {
        crate::log_trace!("{}: {:#x} reserved", builder.name, address);
        return false;
    }
    if config.ping_first && !bus.ping(address) {
        crate::log_trace!("{}: no ack at {:#x}", builder.name, address);
        return false;
    }
    if !(builder.probe)(bus, address) {
        crate::log_debug!("{}: probe failed at {:#x}", builder.name, address);
        return false;
    }

    let mut device = builder.build();
    device.set_address(address);
    device.set_autoload(true);

    if let Err(e) = device.initialize(bus) {
        crate::log_warn!(
            "{} at {:#x} failed to initialize: {:?}",
            builder.name,
            address,
            e
        );
        return false;
    }

    match connected.add(device) {
        Ok(()) => {
            crate::log_info!("{} found at {:#x}", builder.name, address);
            true
        }
        Err(e) => {
            crate::log_warn!("{} at {:#x} not added: {:?}", builder.name, address, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::factory::builder::{DeviceDriver, NULL_ADDRESS};
    use crate::devices::testing::{fake_bus, Fake, FAKE_FAIL_MARKER, FAKE_INIT_REG};
    use crate::platform::mock::{I2cTransaction, MockI2c};
    use crate::platform::I2cConfig;

    static FAKE: DeviceBuilder = DeviceBuilder::of::<Fake>();

    /// Same chip signature as FAKE under another builder name
    static TWIN: DeviceBuilder = DeviceBuilder {
        name: "TWIN",
        ..DeviceBuilder::of::<Fake>()
    };

    static FAKE_SPI: DeviceBuilder = DeviceBuilder {
        name: "FAKE_SPI",
        kind: BusKind::Spi,
        ..DeviceBuilder::of::<Fake>()
    };

    fn factory(builders: &[&'static DeviceBuilder]) -> DeviceFactory {
        let mut factory = DeviceFactory::new();
        for &builder in builders {
            factory.register(builder).unwrap();
        }
        factory
    }

    #[test]
    fn test_empty_bus_creates_nothing() {
        let mut bus = MockI2c::new(I2cConfig::default());
        let mut factory = factory(&[&FAKE, &TWIN]);

        assert_eq!(factory.discover(&mut bus), 0);
        assert!(factory.connected().is_empty());
    }

    #[test]
    fn test_discover_creates_autoloaded_devices() {
        let mut bus = fake_bus(&[0x10, 0x11]);
        let mut factory = factory(&[&FAKE]);

        assert_eq!(factory.discover(&mut bus), 2);

        let devices: std::vec::Vec<_> = factory.connected().iter().collect();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address(), 0x10);
        assert_eq!(devices[1].address(), 0x11);
        for device in devices {
            assert_eq!(device.name(), "FAKE");
            assert!(device.is_autoload());
            assert!(device.is_initialized());
        }
        // initialize configured each chip
        assert_eq!(bus.target(0x10).unwrap().register(u16::from(FAKE_INIT_REG)), 1);
    }

    #[test]
    fn test_claimed_address_is_not_probed_twice() {
        let mut bus = fake_bus(&[0x10]);
        let mut factory = factory(&[&FAKE, &TWIN]);

        assert_eq!(factory.discover(&mut bus), 1);
        assert_eq!(factory.connected().len(), 1);
        assert_eq!(factory.connected().at_address(0x10).unwrap().name(), "FAKE");

        // A second pass finds nothing new and leaves the list intact
        assert_eq!(factory.discover(&mut bus), 0);
        assert_eq!(factory.connected().len(), 1);
    }

    #[test]
    fn test_no_shared_addresses_after_discovery() {
        let mut bus = fake_bus(&[0x10, 0x11]);
        let mut factory = factory(&[&TWIN, &FAKE]);
        factory.discover(&mut bus);

        let mut addresses: std::vec::Vec<u8> =
            factory.connected().iter().map(|d| d.address()).collect();
        let total = addresses.len();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), total);
        // First registered builder wins both addresses
        assert!(factory.connected().iter().all(|d| d.name() == "TWIN"));
    }

    #[test]
    fn test_sentinel_stops_address_list() {
        // Fake lists 0x10, 0x11, NULL_ADDRESS, 0x12
        assert!(Fake::ADDRESSES.contains(&NULL_ADDRESS));
        let mut bus = fake_bus(&[0x12]);
        let mut factory = factory(&[&FAKE]);

        assert_eq!(factory.discover(&mut bus), 0);
        assert!(bus.transactions().iter().all(|t| t.addr() != 0x12));
    }

    #[test]
    fn test_reserved_address_is_never_probed() {
        let mut bus = fake_bus(&[0x10, 0x11]);
        let mut config = DiscoveryConfig::default();
        config.reserve(0x11).unwrap();
        let mut factory = DeviceFactory::with_config(config);
        factory.register(&FAKE).unwrap();

        assert_eq!(factory.discover(&mut bus), 1);
        assert!(bus.transactions().iter().all(|t| t.addr() != 0x11));
    }

    #[test]
    fn test_initialize_failure_is_not_fatal() {
        let mut bus = fake_bus(&[0x10, 0x11]);
        bus.target_mut(0x10)
            .unwrap()
            .set_registers(u16::from(crate::devices::testing::FAKE_STATUS_REG), &[FAKE_FAIL_MARKER]);
        let mut factory = factory(&[&FAKE]);

        assert_eq!(factory.discover(&mut bus), 1);
        assert!(factory.connected().at_address(0x10).is_none());
        assert!(factory.connected().at_address(0x11).is_some());
    }

    #[test]
    fn test_bus_fault_is_not_fatal() {
        let mut bus = fake_bus(&[0x10, 0x11]);
        bus.inject_fault(0x10);
        let mut factory = factory(&[&FAKE]);

        assert_eq!(factory.discover(&mut bus), 1);
    }

    #[test]
    fn test_spi_builders_are_skipped() {
        let mut bus = fake_bus(&[0x10]);
        let mut factory = factory(&[&FAKE_SPI]);

        assert_eq!(factory.discover(&mut bus), 0);
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn test_ping_first_skips_probe_on_silent_address() {
        let mut bus = fake_bus(&[]);
        let mut factory = factory(&[&FAKE]);
        factory.discover(&mut bus);

        // One single-byte read per candidate, no register access
        assert_eq!(
            bus.transactions(),
            vec![
                I2cTransaction::Read { addr: 0x10, len: 1 },
                I2cTransaction::Read { addr: 0x11, len: 1 },
            ]
        );
    }

    #[test]
    fn test_frequency_applied_before_scan() {
        let mut bus = fake_bus(&[]);
        let mut factory = factory(&[&FAKE]);
        factory.config_mut().frequency = Some(400_000);
        factory.discover(&mut bus);
        assert_eq!(bus.frequency(), 400_000);
    }

    #[test]
    fn test_attach_after_discovery_prunes_autoload() {
        let mut bus = fake_bus(&[0x10]);
        let mut factory = factory(&[&FAKE]);
        factory.discover(&mut bus);

        let mut explicit: Box<dyn Device> = Box::new(Fake::default());
        explicit.set_address(0x10);
        explicit.set_name("mine");
        factory.attach(explicit).unwrap();

        assert_eq!(factory.connected().len(), 1);
        let device = factory.connected().at_address(0x10).unwrap();
        assert_eq!(device.name(), "mine");
        assert!(!device.is_autoload());
    }
}
