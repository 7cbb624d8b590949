use atm_modem_core::codec::params;
use atm_modem_core::prelude::*;
use atm_modem_core::protocol::{accumulate, ModeMachine, Termination};
use atm_modem_core::transport::MockEvent;
use pretty_assertions::assert_eq;
use regex::Regex;
use tracing_subscriber::EnvFilter;

/// RUST_LOG=atm_modem_core=debug shows the wire traffic of a failing test
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sim_config(baud_rate: Option<u32>) -> ModemConfig {
    let mut config = ModemConfig::for_port("sim").with_timing(Timing::immediate());
    config.baud_rate = baud_rate;
    config
}

fn connect_sim(modem: SimulatedModem) -> Session<SimulatedModem> {
    init_logging();
    Session::connect(modem, sim_config(Some(9600))).unwrap()
}

#[test]
fn test_mode_round_trip_sends_two_escapes() {
    let mut mock = MockTransport::answering("OK\r\n");
    let log = mock.log();
    mock.open(9600).unwrap();

    let timing = Timing::immediate();
    let mut mode = ModeMachine::new();
    mode.enter_configuration(&mut mock, &timing).unwrap();
    mode.enter_online(&mut mock, &timing).unwrap();
    mode.enter_configuration(&mut mock, &timing).unwrap();

    assert_eq!(mode.mode(), Mode::Configuration);
    let escapes = log.writes().iter().filter(|w| w.as_str() == "+++").count();
    assert_eq!(escapes, 2);
}

#[test]
fn test_pattern_accumulator_waits_for_terminator() {
    let mut mock = MockTransport::new();
    mock.open(9600).unwrap();
    mock.queue("A\r\n");
    mock.queue("B\r\n");
    mock.queue("DONE\r\n");

    let response = accumulate(
        &mut mock,
        &Timing::immediate(),
        &Termination::Pattern(Regex::new("DONE\r\n").unwrap()),
        "ATX1",
    )
    .unwrap();
    assert_eq!(response.lines(), ["A", "B", "DONE"]);
}

#[test]
fn test_idle_accumulator_does_not_wait_for_late_data() {
    let mut mock = MockTransport::new();
    mock.open(9600).unwrap();
    mock.queue_silence(1);
    mock.queue("late\r\n");

    let response = accumulate(&mut mock, &Timing::immediate(), &Termination::Idle, "AT").unwrap();
    assert!(response.is_empty());
}

#[test]
fn test_baud_change_is_one_command_then_close_then_open() {
    let mock = MockTransport::answering("OK\r\n");
    let log = mock.log();
    let config = ModemConfig::for_port("mock")
        .with_baud_rate(9600)
        .with_timing(Timing::immediate());
    let mut modem = Session::connect(mock, config).unwrap();
    modem.attention().unwrap();
    log.clear();

    modem.set(&params::P1_BAUD, 57600).unwrap();

    assert_eq!(
        log.events(),
        vec![
            MockEvent::Write(b"@P1Baud=57600\r\n".to_vec()),
            MockEvent::Close,
            MockEvent::Open(57600),
        ]
    );
}

#[test]
fn test_baud_change_follows_simulated_modem() {
    let mut modem = connect_sim(SimulatedModem::new(9600));
    modem.set(&params::P1_BAUD, 115200).unwrap();
    assert_eq!(modem.baud_rate(), 115200);
    assert_eq!(modem.transport().baud_rate(), 115200);

    // Still talking after the switch
    assert_eq!(modem.get(&params::P1_BAUD).unwrap(), 115200);
}

#[test]
fn test_host_on_port_two_follows_p2_baud() {
    let mut config = sim_config(Some(9600));
    config.host_port = HostPort::P2;
    let sim = SimulatedModem::new(9600).with_host_port(HostPort::P2);
    let mut modem = Session::connect(sim, config).unwrap();

    modem.set(&params::P1_BAUD, 4800).unwrap();
    assert_eq!(modem.baud_rate(), 9600);

    modem.set(&params::P2_BAUD, 2400).unwrap();
    assert_eq!(modem.baud_rate(), 2400);
    assert_eq!(modem.get(&params::P1_BAUD).unwrap(), 4800);
}

#[test]
fn test_explicit_unsupported_rate_never_opens() {
    let mock = MockTransport::answering("OK\r\n");
    let log = mock.log();
    let config = ModemConfig::for_port("mock").with_baud_rate(4801);

    let result = Session::connect(mock, config);
    assert!(matches!(result, Err(ModemError::Validation(_))));
    assert_eq!(log.opens(), Vec::<u32>::new());
}

#[test]
fn test_probe_finds_modem_after_one_failed_rate() {
    let mut config = sim_config(None);
    config.probe_rates = vec![1200, 9600];

    let modem = Session::connect(SimulatedModem::new(9600), config).unwrap();
    assert_eq!(modem.baud_rate(), 9600);
    assert_eq!(modem.mode(), Mode::Online);
    assert_eq!(modem.transport().mode(), Mode::Online);
}

#[test]
fn test_auto_baud_attempt_order_against_stub() {
    let mock = MockTransport::new().with_responder(|data, baud| {
        if baud != 9600 {
            return Vec::new();
        }
        match data {
            b"+++" => vec![b"\r\nOK\r\n".to_vec()],
            _ => vec![b"\r\nCONNECT\r\n".to_vec()],
        }
    });
    let log = mock.log();
    let mut config = ModemConfig::for_port("mock").with_timing(Timing::immediate());
    config.probe_rates = vec![1200, 9600];

    Session::connect(mock, config).unwrap();

    assert_eq!(
        log.events(),
        vec![
            MockEvent::Open(1200),
            MockEvent::Write(b"+++".to_vec()),
            MockEvent::Close,
            MockEvent::Open(9600),
            MockEvent::Write(b"+++".to_vec()),
            MockEvent::Write(b"ATO\r\n".to_vec()),
            MockEvent::Write(b"+++".to_vec()),
            MockEvent::Write(b"@P1EchoChar=Dis\r\n".to_vec()),
            MockEvent::Write(b"ATO\r\n".to_vec()),
        ]
    );
}

#[test]
fn test_connect_turns_off_echo() {
    let mut modem = connect_sim(SimulatedModem::new(9600).with_echo(true));
    assert_eq!(modem.transport().setting("P1EchoChar"), Some("Dis"));
    assert_eq!(modem.get(&params::TX_POWER).unwrap().code, 1);
    assert_eq!(modem.mode(), Mode::Configuration);
}

#[test]
fn test_echo_left_on_breaks_parameter_reads() {
    init_logging();
    let mut config = sim_config(Some(9600));
    config.disable_echo = false;
    let sim = SimulatedModem::new(9600).with_echo(true);
    let mut modem = Session::connect(sim, config).unwrap();

    match modem.get(&params::TX_POWER) {
        Err(ModemError::Protocol(ProtocolError::UnexpectedResponse { line, .. })) => {
            assert_eq!(line, "@TxPower");
        }
        other => panic!("expected UnexpectedResponse, got {:?}", other),
    }
}

#[test]
fn test_probe_with_no_live_rate() {
    let mut config = sim_config(None);
    config.probe_rates = vec![1200, 2400];

    match Session::connect(SimulatedModem::new(115200), config) {
        Err(ModemError::Connect(ConnectError::NoModemDetected { tried })) => {
            assert_eq!(tried, vec![1200, 2400]);
        }
        other => panic!("expected NoModemDetected, got {:?}", other.err()),
    }
}

#[test]
fn test_payload_passthrough_returns_online() {
    let mut modem = connect_sim(SimulatedModem::new(9600));
    let version = modem.firmware_version().unwrap();
    assert_eq!(version.len(), 4);
    assert_eq!(modem.mode(), Mode::Configuration);

    modem.write(b"telemetry 42\r\n").unwrap();
    assert_eq!(modem.mode(), Mode::Online);
    assert_eq!(modem.transport().mode(), Mode::Online);
    assert_eq!(modem.read_line().unwrap().as_deref(), Some("telemetry 42"));

    modem.write(b"xyz").unwrap();
    assert_eq!(modem.read(Some(2)).unwrap(), b"xy".to_vec());
    assert_eq!(modem.read(None).unwrap(), b"z".to_vec());
}

#[test]
fn test_status_and_identification() {
    let mut modem = connect_sim(SimulatedModem::new(9600));
    assert_eq!(modem.serial_number().unwrap(), 90210);

    let volts = modem.voltage().unwrap();
    assert!((12.0..13.0).contains(&volts), "{}", volts);
    let temp = modem.temperature().unwrap();
    assert!((17.0..20.0).contains(&temp), "{}", temp);

    let report = modem.mode_report().unwrap();
    assert!(report.iter().any(|l| l == "Host Baud: 9600"));
}

#[test]
fn test_link_test_against_simulated_remote() {
    let mut modem = connect_sim(SimulatedModem::new(9600).with_seed(7));

    let report = modem.link_test(1).unwrap();
    assert_eq!(report.outcome, TestOutcome::Passed);
    assert_eq!(report.address, 1);
    let snr = report.metric("SNR").map(|m| m.value).unwrap();
    assert!((16.5..=19.5).contains(&snr), "{}", snr);
    assert_eq!(
        report.metric("Range").and_then(|m| m.unit.clone()),
        Some("m".to_string())
    );

    let missing = modem.link_test(9).unwrap();
    assert_eq!(missing.outcome, TestOutcome::Failed);
}

#[test]
fn test_rate_test_against_simulated_remote() {
    let mut modem = connect_sim(SimulatedModem::new(9600).with_remote(4));

    let report = modem.rate_test(4).unwrap();
    assert_eq!(report.outcome, TestOutcome::Passed);
    let snrs = report.metrics.iter().filter(|m| m.name == "SNR").count();
    assert_eq!(snrs, 4);
    assert_eq!(report.lines.last().map(String::as_str), Some("Rate test complete"));

    let aborted = modem.rate_test(200).unwrap();
    assert_eq!(aborted.outcome, TestOutcome::Failed);
}

#[test]
fn test_dial_and_hang_up() {
    let mut modem = connect_sim(SimulatedModem::new(9600));
    let reply = modem.dial(1).unwrap();
    assert_eq!(reply, vec!["CONNECT 1"]);
    assert_eq!(modem.mode(), Mode::Online);
    assert_eq!(modem.transport().mode(), Mode::Online);

    assert_eq!(modem.hang_up().unwrap(), vec!["DISCONNECTED"]);
    assert_eq!(modem.mode(), Mode::Configuration);
}

#[test]
fn test_failed_dial_keeps_modes_in_step() {
    let mut modem = connect_sim(SimulatedModem::new(9600));
    assert_eq!(modem.dial(9).unwrap(), vec!["NO CARRIER"]);
    assert_eq!(modem.mode(), Mode::Configuration);
    assert_eq!(modem.transport().mode(), Mode::Configuration);

    // Payload after a failed dial goes Online first and is looped back
    modem.write(b"payload\r\n").unwrap();
    assert_eq!(modem.transport().mode(), Mode::Online);
    assert_eq!(modem.read_line().unwrap().as_deref(), Some("payload"));
}

#[test]
fn test_registers_and_settings_persist() {
    let mut modem = connect_sim(SimulatedModem::new(9600));
    modem.write_register(5, 200).unwrap();
    assert_eq!(modem.read_register(5).unwrap(), 200);

    modem.set(&params::TX_POWER, 3).unwrap();
    modem.write_settings().unwrap();
    modem.factory_reset().unwrap();
    assert_eq!(modem.get(&params::TX_POWER).unwrap().code, 1);
    assert_eq!(modem.read_register(5).unwrap(), 0);
}

#[test]
fn test_close_returns_closed_transport() {
    let modem = connect_sim(SimulatedModem::new(9600));
    let sim = modem.close();
    assert!(!sim.is_open());
}

#[test]
fn test_boxed_transport_session() {
    let transport: Box<dyn Transport> = Box::new(SimulatedModem::new(9600));
    let mut modem = Session::connect(transport, sim_config(Some(9600))).unwrap();
    assert!(modem.attention().unwrap().contains(&"OK".to_string()));
}
