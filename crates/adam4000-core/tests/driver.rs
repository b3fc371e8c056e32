mod common;

use adam4000_core::module::{Adam4017, AnalogReading, DriverError, DriverState, InputRange};
use adam4000_core::protocol::{checksum, DeviceAddress, ParseError};
use common::{analog_reply, framed, MockBus};
use pretty_assertions::assert_eq;

fn driver(bus: &MockBus) -> Adam4017<MockBus> {
    Adam4017::with_channel(bus.clone(), DeviceAddress::new(1))
}

#[test]
fn test_read_analog_in_valid_reply() {
    let bus = MockBus::scripted(vec![framed(">0012.00")]);
    let mut module = driver(&bus);

    let reading = module.read_analog_in(0).unwrap();
    assert_eq!(reading, AnalogReading::Value(12.0));

    // '#' + '0' + '1' + '0' = 180 = 0xB4
    assert_eq!(bus.written(), vec![b"#010B4\r".to_vec()]);
}

#[test]
fn test_read_analog_in_altered_checksum() {
    let mut reply = framed(">0012.00");
    let n = reply.len();
    reply[n - 2] = if reply[n - 2] == b'0' { b'1' } else { b'0' };

    let bus = MockBus::scripted(vec![reply]);
    let mut module = driver(&bus);

    let reading = module.read_analog_in(0).unwrap();
    assert!(matches!(
        reading,
        AnalogReading::Invalid(ParseError::ChecksumMismatch { .. })
    ));
    assert_eq!(reading.value(), None);
}

#[test]
fn test_reply_with_wrong_claimed_checksum() {
    // ">0012.00" sums to 0x8F, not 0x4B
    assert_eq!(checksum::compute(b">0012.00"), "8F");
    let bus = MockBus::scripted(vec![b">0012.004B\r".to_vec()]);
    let mut module = driver(&bus);

    assert_eq!(
        module.read_analog_in(0).unwrap(),
        AnalogReading::Invalid(ParseError::ChecksumMismatch {
            expected: "8F".to_string(),
            actual: "4B".to_string(),
        })
    );

    let bus = MockBus::scripted(vec![b">0012.008F\r".to_vec()]);
    let mut module = driver(&bus);
    assert_eq!(module.read_analog_in(0).unwrap(), AnalogReading::Value(12.0));
}

#[test]
fn test_silent_module_gives_invalid_reading() {
    let bus = MockBus::scripted(vec![]);
    let mut module = driver(&bus);
    assert_eq!(
        module.read_analog_in(2).unwrap(),
        AnalogReading::Invalid(ParseError::NoDelimiter)
    );
}

#[test]
fn test_truncated_reply_gives_invalid_reading() {
    let bus = MockBus::scripted(vec![b">0012.0".to_vec()]);
    let mut module = driver(&bus);
    assert_eq!(
        module.read_analog_in(1).unwrap(),
        AnalogReading::Invalid(ParseError::NoTerminator)
    );
}

#[test]
fn test_driver_keeps_working_after_bus_error() {
    let bus = MockBus::scripted(vec![b"garbage\r".to_vec(), analog_reply(4.0)]);
    let mut module = driver(&bus);
    assert!(!module.read_analog_in(0).unwrap().is_valid());
    assert_eq!(module.read_analog_in(0).unwrap(), AnalogReading::Value(4.0));
}

#[test]
fn test_invalid_channel_rejected_without_io() {
    let bus = MockBus::scripted(vec![analog_reply(1.0)]);
    let mut module = driver(&bus);
    assert!(matches!(
        module.read_analog_in(4),
        Err(DriverError::InvalidChannel(4))
    ));
    assert!(bus.written().is_empty());
}

#[test]
fn test_read_all_analog() {
    let bus = MockBus::simulated([Some(4.0), Some(12.0), None, Some(20.0)]);
    let mut module = driver(&bus);

    let readings = module.read_all_analog().unwrap();
    let values: Vec<Option<f64>> = readings.iter().map(|(_, r)| r.value()).collect();
    assert_eq!(values, vec![Some(4.0), Some(12.0), None, Some(20.0)]);

    let channels: Vec<u8> = bus.written().iter().map(|w| w[3] - b'0').collect();
    assert_eq!(channels, vec![0, 1, 2, 3]);
}

#[test]
fn test_text_commands_return_raw_reply() {
    let bus = MockBus::scripted(vec![
        framed("!010D0640"),
        framed("!01A1.20"),
        framed("!014017"),
    ]);
    let mut module = driver(&bus);

    let config = module.read_configuration().unwrap();
    assert_eq!(config.as_bytes(), framed("!010D0640").as_slice());
    let firmware = module.read_firmware_version().unwrap();
    assert_eq!(firmware.as_bytes(), framed("!01A1.20").as_slice());
    let name = module.read_module_name().unwrap();
    assert_eq!(name.as_bytes(), framed("!014017").as_slice());

    assert_eq!(
        bus.written(),
        vec![b"$012B7\r".to_vec(), b"$01FCB\r".to_vec(), b"$01MD2\r".to_vec()]
    );
}

#[test]
fn test_text_command_silence_is_empty_string() {
    let bus = MockBus::scripted(vec![]);
    let mut module = driver(&bus);
    assert_eq!(module.read_module_name().unwrap(), "");
}

#[test]
fn test_decoded_configuration() {
    let bus = MockBus::scripted(vec![framed("!010D0640")]);
    let mut module = driver(&bus);
    let config = module.configuration().unwrap();
    assert_eq!(config.address, DeviceAddress::new(1));
    assert_eq!(config.input_range, InputRange::PlusMinus20mA);
    assert_eq!(config.baud_rate(), Some(9600));
}

#[test]
fn test_decoded_configuration_reports_parse_error() {
    let bus = MockBus::scripted(vec![]);
    let mut module = driver(&bus);
    assert!(matches!(
        module.configuration(),
        Err(DriverError::Parse(ParseError::NoDelimiter))
    ));
}

#[test]
fn test_line_driver_toggles_per_exchange() {
    let bus = MockBus::scripted(vec![analog_reply(5.0), analog_reply(6.0)]);
    let mut module = driver(&bus);
    module.read_analog_in(0).unwrap();
    module.read_analog_in(1).unwrap();
    assert_eq!(bus.rts(), vec![true, false, true, false]);
    assert_eq!(bus.clears(), 2);
}

#[test]
fn test_stale_bytes_are_discarded() {
    let bus = MockBus::scripted(vec![analog_reply(7.5)]);
    bus.inject_stale(&analog_reply(19.0));
    let mut module = driver(&bus);
    assert_eq!(module.read_analog_in(0).unwrap(), AnalogReading::Value(7.5));
}

#[test]
fn test_drop_releases_line_driver() {
    let bus = MockBus::scripted(vec![analog_reply(5.0)]);
    {
        let mut module = driver(&bus);
        module.read_analog_in(0).unwrap();
    }
    assert_eq!(bus.rts().last(), Some(&false));
    assert_eq!(bus.rts().len(), 3);
}

#[test]
fn test_stats() {
    let bus = MockBus::scripted(vec![analog_reply(5.0)]);
    let mut module = driver(&bus);
    module.read_analog_in(0).unwrap();
    module.read_analog_in(0).unwrap();
    let stats = module.stats().unwrap();
    assert_eq!(stats.exchanges, 2);
    assert_eq!(stats.silent_responses, 1);
}

#[test]
fn test_unopenable_port_makes_driver_unavailable() {
    let mut module = Adam4017::open("/dev/adam4000-missing-adapter", DeviceAddress::new(1));
    assert_eq!(module.state(), DriverState::Unavailable);
    assert!(!module.is_ready());
    assert!(module.stats().is_none());

    assert!(matches!(module.read_analog_in(0), Err(DriverError::Unavailable)));
    assert!(matches!(module.read_configuration(), Err(DriverError::Unavailable)));
    assert!(matches!(module.read_firmware_version(), Err(DriverError::Unavailable)));
    assert!(matches!(module.read_module_name(), Err(DriverError::Unavailable)));
    assert!(matches!(module.read_all_analog(), Err(DriverError::Unavailable)));
}

#[test]
fn test_try_open_reports_open_failure() {
    let result = Adam4017::try_open("/dev/adam4000-missing-adapter", DeviceAddress::new(1));
    assert!(matches!(result, Err(DriverError::OpenFailure(_))));
}

#[test]
fn test_ready_driver_state() {
    let bus = MockBus::scripted(vec![]);
    let module = driver(&bus);
    assert_eq!(module.state(), DriverState::Ready);
    assert_eq!(module.address().to_string(), "01");
}
