use adc_hub::{AdcHub, Error, Phase};
use embedded_hal::i2c::ErrorKind;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
use mcp342x::{Address, Mcp342x, Sample, Variant};

/// Captures the delays the pipeline requests instead of sleeping.
#[derive(Default)]
struct RecordingDelay {
    ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}

fn init_logging() {
    simple_logger::SimpleLogger::new().init().ok();
}

#[test]
fn channels_partition_across_devices() {
    init_logging();

    let i2c = Mock::new(&[]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A1), Variant::Mcp3422)
        .unwrap();

    assert_eq!(hub.device_count(), 2);
    assert_eq!(hub.channel_count(), 6);

    for channel in 0..6 {
        assert!(hub.describe_channel(channel).is_ok());
    }
    assert_eq!(
        hub.describe_channel(6).map(|_| ()),
        Err(Error::ChannelNotFound)
    );

    i2c.clone().done();
}

#[test]
fn configure_range_updates_described_channel() {
    let i2c = Mock::new(&[]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();

    hub.configure_range(1, 1, 1, 2, 1).unwrap();

    let report = hub.describe_channel(1).unwrap().to_string();
    assert!(report.contains("SAMP=2"), "{report}");
    assert!(report.contains("PGA=1"), "{report}");
    assert!(report.contains("Mode=V"), "{report}");

    i2c.clone().done();
}

#[test]
fn out_of_range_parameters_are_rejected_up_front() {
    let i2c = Mock::new(&[]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();

    assert_eq!(hub.configure_range(0, 3, 1, 4, 0), Err(Error::InvalidParameter));
    assert_eq!(hub.configure_range(0, 3, 4, 0, 0), Err(Error::InvalidParameter));
    assert_eq!(hub.configure_range(0, 3, 1, 0, 4), Err(Error::InvalidParameter));

    // Nothing may have been applied.
    for channel in 0..4 {
        let report = hub.describe_channel(channel).unwrap().to_string();
        assert!(report.contains("SAMP=0"), "{report}");
        assert!(report.contains("PGA=0"), "{report}");
    }

    i2c.clone().done();
}

#[test]
fn configure_range_is_best_effort_across_unmapped_channels() {
    let i2c = Mock::new(&[]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();

    // Channels 0..=3 exist, 4 does not: the valid prefix sticks.
    assert_eq!(
        hub.configure_range(2, 4, 1, 1, 1),
        Err(Error::ChannelNotFound)
    );

    for channel in [2, 3] {
        let report = hub.describe_channel(channel).unwrap().to_string();
        assert!(report.contains("SAMP=1"), "{report}");
    }
    let report = hub.describe_channel(0).unwrap().to_string();
    assert!(report.contains("SAMP=0"), "{report}");

    i2c.clone().done();
}

#[async_std::test]
async fn sense_runs_trigger_delay_read_and_stores_the_value() {
    init_logging();

    let i2c = Mock::new(&[
        // Channel 1, 16-bit, gain x2, ready bit set.
        Transaction::write(0x68, vec![0xA9]),
        Transaction::read(0x68, vec![0x00, 0x01, 0x29]),
    ]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();
    hub.configure_range(1, 1, 1, 2, 1).unwrap();

    let mut delay = RecordingDelay::default();
    let volts = hub.sense(1, &mut delay).await.unwrap();

    assert_eq!(volts, Sample::VOLTS_PER_LSB);
    assert_eq!(hub.scaled_value(1), Ok(volts));
    assert_eq!(delay.ms, vec![67]);
    assert_eq!(hub.device_phase(0), Some(Phase::Idle));
    assert_eq!(hub.is_busy(1), Ok(false));

    i2c.clone().done();
}

#[async_std::test]
async fn eighteen_bit_results_are_sign_extended() {
    let i2c = Mock::new(&[
        Transaction::write(0x68, vec![0x8C]),
        Transaction::read(0x68, vec![0x80, 0x00, 0x00, 0x0C]),
    ]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();
    hub.configure_range(0, 0, 1, 3, 0).unwrap();

    let mut delay = RecordingDelay::default();
    let volts = hub.sense(0, &mut delay).await.unwrap();

    assert!(volts < 0.0, "sign bit must not decode as a large positive value");
    assert_eq!(volts, -8_388_608.0 * Sample::VOLTS_PER_LSB);
    assert_eq!(delay.ms, vec![267]);

    i2c.clone().done();
}

#[async_std::test]
async fn transport_failure_leaves_the_device_busy_in_its_phase() {
    let failing = Mock::new(&[
        Transaction::write(0x68, vec![0x80]).with_error(ErrorKind::Other)
    ]);
    let healthy = Mock::new(&[
        Transaction::write(0x69, vec![0x80]),
        Transaction::read(0x69, vec![0x00, 0x01, 0x00]),
    ]);

    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(failing.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();
    hub.add_device(Mcp342x::new(healthy.clone(), Address::A1), Variant::Mcp3422)
        .unwrap();

    let mut delay = RecordingDelay::default();
    assert_eq!(
        hub.sense(0, &mut delay).await,
        Err(Error::Transfer(ErrorKind::Other))
    );

    // No rollback: the device stays busy where the pipeline stopped.
    assert_eq!(hub.is_busy(0), Ok(true));
    assert_eq!(hub.is_busy(3), Ok(true));
    assert_eq!(hub.device_phase(0), Some(Phase::Triggered));
    assert_eq!(hub.sense(0, &mut delay).await, Err(Error::DeviceBusy));
    assert_eq!(hub.sense(3, &mut delay).await, Err(Error::DeviceBusy));

    // The other device's pipeline is unaffected.
    assert_eq!(hub.is_busy(4), Ok(false));
    assert!(hub.sense(4, &mut delay).await.is_ok());

    failing.clone().done();
    healthy.clone().done();
}

#[async_std::test]
async fn unmapped_channel_is_reported_not_retried() {
    let i2c = Mock::new(&[]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3421)
        .unwrap();

    let mut delay = RecordingDelay::default();
    assert_eq!(hub.sense(42, &mut delay).await, Err(Error::ChannelNotFound));
    assert_eq!(hub.scaled_value(42), Err(Error::ChannelNotFound));

    i2c.clone().done();
}

#[test]
fn registration_fails_when_a_table_is_full() {
    let i2c = Mock::new(&[]);

    let mut small: AdcHub<Mock, 1, 16> = AdcHub::new();
    small
        .add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3421)
        .unwrap();
    assert_eq!(
        small
            .add_device(Mcp342x::new(i2c.clone(), Address::A1), Variant::Mcp3421)
            .map(|_| ()),
        Err(Error::TableFull)
    );

    let mut narrow: AdcHub<Mock, 4, 4> = AdcHub::new();
    narrow
        .add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3424)
        .unwrap();
    assert_eq!(
        narrow
            .add_device(Mcp342x::new(i2c.clone(), Address::A1), Variant::Mcp3421)
            .map(|_| ()),
        Err(Error::TableFull)
    );

    i2c.clone().done();
}

#[test]
fn device_report_lists_every_channel_with_its_address() {
    let i2c = Mock::new(&[]);
    let mut hub: AdcHub<Mock> = AdcHub::new();
    hub.add_device(Mcp342x::new(i2c.clone(), Address::A0), Variant::Mcp3423)
        .unwrap();

    let report = hub.describe_device(0).unwrap().to_string();
    assert_eq!(report.lines().count(), 2);
    assert!(report.contains("A=0x68"), "{report}");
    assert!(report.starts_with("#0"), "{report}");

    assert!(hub.describe_device(1).is_none());
    assert_eq!(hub.describe_all().count(), 1);

    i2c.clone().done();
}
