//! ATM-900 configuration parameter catalogue
//!
//! Keywords follow what the firmware actually accepts, which differs from
//! the user's manual in places (`@P1FlowCtl`, not `@P1FlowCtrl`).

use super::{ClockTime, Coded, Decimal, Domain, Enable, Integer, Param, ParameterSpec, Scaled};
use crate::config::HostPort;

/// Serial baud rates
pub const BAUD_RATES: Domain = Domain::Set(&[1200, 2400, 4800, 9600, 19200, 57600, 115200]);

/// Unicast addresses plus the broadcast address
pub const ADDRESSES: Domain = Domain::Spans(&[(0, 249), (255, 255)]);

/// Addresses a modem can be given
pub const LOCAL_ADDRESSES: Domain = Domain::Spans(&[(0, 249)]);

/// Acoustic bit rate codes (140 to 15360 bits/s)
pub const BIT_RATES: Domain = Domain::Spans(&[(2, 13)]);

/// Transmit power levels, -21 dB (1) to 0 dB (8)
pub const POWER_LEVELS: Domain = Domain::Spans(&[(1, 8)]);

/// Modem serial ports
pub const SERIAL_PORTS: Domain = Domain::Spans(&[(1, 2)]);

/// S-register numbers and values
pub const REGISTERS: Domain = Domain::Spans(&[(0, 255)]);
/// S-register values
pub const REGISTER_VALUES: Domain = Domain::Spans(&[(0, 255)]);

// Serial ports

/// Serial port 1 baud rate
pub const P1_BAUD: Param<Integer> = Param::baud("P1Baud", "@P1Baud", 1);
/// Serial port 1 character echo
pub const P1_ECHO_CHAR: Param<Enable> = Param::enable("P1EchoChar", "@P1EchoChar");
/// 0 None, 1 SW (XON/XOFF), 2 HW (RTS/CTS), 3 HW-LP
pub const P1_FLOW_CTL: Param<Coded> =
    Param::coded("P1FlowCtl", "@P1FlowCtl", Domain::Spans(&[(0, 3)]));
/// 0 RS-232, 1 RS-422
pub const P1_PROTOCOL: Param<Coded> =
    Param::coded("P1Protocol", "@P1Protocol", Domain::Spans(&[(0, 1)]));
/// Strip bit 7 of serial port 1 input
pub const P1_STRIP_B7: Param<Enable> = Param::enable("P1StripB7", "@P1StripB7");

/// Serial port 2 baud rate
pub const P2_BAUD: Param<Integer> = Param::baud("P2Baud", "@P2Baud", 2);
/// Serial port 2 character echo
pub const P2_ECHO_CHAR: Param<Enable> = Param::enable("P2EchoChar", "@P2EchoChar");
/// Serial port 2 flow control, coded as for port 1
pub const P2_FLOW_CTL: Param<Coded> =
    Param::coded("P2FlowCtl", "@P2FlowCtl", Domain::Spans(&[(0, 3)]));
/// Strip bit 7 of serial port 2 input
pub const P2_STRIP_B7: Param<Enable> = Param::enable("P2StripB7", "@P2StripB7");

// System

/// 0 Off, 1 Ext0, 2 RTC, 3 Ext1
pub const SYNC_PPS: Param<Coded> = Param::coded("SyncPPS", "@SyncPPS", Domain::Spans(&[(0, 3)]));
/// Low power idle timer
pub const IDLE_TIMER: Param<ClockTime> = Param::clock_time("IdleTimer", "@IdleTimer");
/// 0 data .. 4 factory
pub const VERBOSE: Param<Coded> = Param::coded("Verbose", "@Verbose", Domain::Spans(&[(0, 4)]));
/// Command prompt style, 0-7
pub const PROMPT: Param<Coded> = Param::coded("Prompt", "@Prompt", Domain::Spans(&[(0, 7)]));
/// Compact modem wakeup period: -1 off, 0-9 and 11 select 2 to 96 s
pub const CM_WAKE_HIB: Param<Coded> =
    Param::coded("CMWakeHib", "@CMWakeHib", Domain::Spans(&[(-1, 9), (11, 11)]));
/// Compact modem fast wakeup
pub const CM_FAST_WAKE: Param<Enable> = Param::enable("CMFastWake", "@CMFastWake");
/// 0 Off, 1 Powersave, 2 AlwaysOn, 3 Program
pub const CP_BOARD: Param<Coded> = Param::coded("CPBoard", "@CPBoard", Domain::Spans(&[(0, 3)]));

// Data logger

/// 0 UART, 1 Datalog, 2 UART+Datalog
pub const AC_DATA: Param<Coded> = Param::coded("AcData", "@AcData", Domain::Spans(&[(0, 2)]));
/// 0 Off, 1 Stats, 4 TimeStamp, 5 Stats+Time
pub const AC_STATS: Param<Coded> = Param::coded("AcStats", "@AcStats", Domain::Set(&[0, 1, 4, 5]));
/// Data logger ring buffer
pub const RING_BUF: Param<Enable> = Param::enable("RingBuf", "@RingBuf");
/// Data logger sub-blocks
pub const SUB_BLKS: Param<Integer> =
    Param::integer("SubBlks", "@SubBlks", Domain::Spans(&[(1, 15)]));
/// 0 FwdDelay, 1 Sentinel, 2 ChrCount
pub const LOG_MODE: Param<Coded> = Param::coded("LogMode", "@LogMode", Domain::Spans(&[(0, 2)]));
/// Sentinel character for sentinel logging
pub const SENTINEL: Param<Integer> =
    Param::integer("Sentinel", "@Sentinel", Domain::Spans(&[(0, 255)]));
/// Characters per record for count logging
pub const CHR_COUNT: Param<Integer> =
    Param::integer("ChrCount", "@ChrCount", Domain::Spans(&[(0, 4096)]));
/// 0 Local, 1 SDHC
pub const LOG_STORE: Param<Coded> =
    Param::coded("LogStore", "@LogStore", Domain::Spans(&[(0, 1)]));

// Acoustic link

/// Retry failed acoustic packets
pub const DATA_RETRY: Param<Enable> = Param::enable("DataRetry", "@DataRetry");
/// Acoustic response timeout, seconds
pub const AC_RSP_TM_OUT: Param<Decimal> = Param::decimal(
    "AcRspTmOut",
    "@AcRspTmOut",
    Domain::Stepped {
        min: 2.0,
        max: 99.5,
        step: 0.5,
    },
);
/// 0 Command, 1 Online, 2 Datalog
pub const OP_MODE: Param<Coded> = Param::coded("OpMode", "@OpMode", Domain::Spans(&[(0, 2)]));
/// 0 Auto, 1 MBARI (reserved), 2 Manual
pub const DEV_ENABLE: Param<Coded> =
    Param::coded("DevEnable", "@DevEnable", Domain::Spans(&[(0, 2)]));
/// Forwarding delay, seconds
pub const FWD_DELAY: Param<Decimal> = Param::decimal(
    "FwdDelay",
    "@FwdDelay",
    Domain::Stepped {
        min: 0.0,
        max: 5.0,
        step: 0.05,
    },
);
/// This modem's address
pub const LOCAL_ADDR: Param<Integer> = Param::integer("LocalAddr", "@LocalAddr", LOCAL_ADDRESSES);
/// Default destination address
pub const REMOTE_ADDR: Param<Integer> = Param::integer("RemoteAddr", "@RemoteAddr", ADDRESSES);
/// Pass on packets that failed their CRC
pub const SHOW_BAD_DATA: Param<Enable> = Param::enable("ShowBadData", "@ShowBadData");
/// Transmit start tones
pub const START_TONES: Param<Enable> = Param::enable("StartTones", "@StartTones");
/// Acoustic bit rate code
pub const TX_RATE: Param<Coded> = Param::coded("TxRate", "@TxRate", BIT_RATES);
/// Transmit power level, 1 (-21 dB) to 8 (0 dB)
pub const TX_POWER: Param<Coded> = Param::coded("TxPower", "@TxPower", POWER_LEVELS);
/// Transmit wakeup tones
pub const WAKE_TONES: Param<Enable> = Param::enable("WakeTones", "@WakeTones");
/// Print received data as hex
pub const PRINT_HEX: Param<Enable> = Param::enable("PrintHex", "@PrintHex");
/// Require the `AT` prefix on commands
pub const STRICT_AT: Param<Enable> = Param::enable("StrictAT", "@StrictAT");

// Transport addressing

/// 1 Single, 2 Dual
pub const INPUT_MODE: Param<Coded> =
    Param::coded("InputMode", "@InputMode", Domain::Spans(&[(1, 2)]));
/// Hours until release activation
pub const TIMED_RELEASE: Param<Integer> =
    Param::integer("TimedRelease", "@TimedRelease", Domain::Spans(&[(0, 999)]));
/// 0 InpMode, 1 AlwaysOn
pub const T_PORT_MODE: Param<Coded> =
    Param::coded("TPortMode", "@TPortMode", Domain::Spans(&[(0, 1)]));
/// Transport address of serial port 1 input
pub const SRC_P1: Param<Integer> = Param::integer("SrcP1", "@SrcP1", Domain::Spans(&[(1, 4)]));
/// Transport address of serial port 2 input
pub const SRC_P2: Param<Integer> = Param::integer("SrcP2", "@SrcP2", Domain::Spans(&[(1, 4)]));
/// Output port for transport address 1: 1 P1, 2 P2
pub const DST1: Param<Coded> = Param::coded("Dst1", "@Dst1", SERIAL_PORTS);
/// Output port for transport address 2: 1 P1, 2 P2
pub const DST2: Param<Coded> = Param::coded("Dst2", "@Dst2", SERIAL_PORTS);

// Test and tuning

/// Simulated acoustic delay, ms
pub const SIM_AC_DLY: Param<Integer> =
    Param::integer("SimAcDly", "@SimAcDly", Domain::Spans(&[(0, 30000)]));
/// Echo received packets back to the sender
pub const PKT_ECHO: Param<Enable> = Param::enable("PktEcho", "@PktEcho");
/// 0 8B .. 7 4096B
pub const PKT_SIZE: Param<Coded> = Param::coded("PktSize", "@PktSize", Domain::Spans(&[(0, 7)]));
/// Receive packets addressed to any modem
pub const RCV_ALL: Param<Enable> = Param::enable("RcvAll", "@RcvAll");
/// Receive frequency, Hz
pub const RX_FREQ: Param<Integer> = Param::integer(
    "RxFreq",
    "@RxFreq",
    Domain::Stepped {
        min: 7000.0,
        max: 16000.0,
        step: 250.0,
    },
);
/// Receiver detection threshold
pub const RX_THRESH: Param<Integer> =
    Param::integer("RxThresh", "@RxThresh", Domain::Spans(&[(10, 256)]));
/// 0 12.5ms, 1 6.25ms, 5-15 that many ms
pub const RX_TONE_DUR: Param<Coded> =
    Param::coded("RxToneDur", "@RxToneDur", Domain::Spans(&[(0, 1), (5, 15)]));
/// Receiver lockout, ms
pub const RX_LOCKOUT: Param<Integer> =
    Param::integer("RxLockout", "@RxLockout", Domain::Spans(&[(0, 1000)]));
/// Transmit pulse width, ms (wire: tenths of ms)
pub const TX_TONE_DUR: Param<Scaled> = Param::scaled(
    "TxToneDur",
    "@TxToneDur",
    10.0,
    Domain::Stepped {
        min: 10.0,
        max: 25.0,
        step: 0.1,
    },
);
/// Transponder turn-around time, ms (wire: tenths of ms)
pub const TAT: Param<Scaled> = Param::scaled(
    "TAT",
    "@TAT",
    10.0,
    Domain::Stepped {
        min: 0.0,
        max: 100.0,
        step: 0.1,
    },
);

/// Every parameter, in the order the modem lists them
pub static ALL: &[&ParameterSpec] = &[
    &P1_BAUD.spec,
    &P1_ECHO_CHAR.spec,
    &P1_FLOW_CTL.spec,
    &P1_PROTOCOL.spec,
    &P1_STRIP_B7.spec,
    &P2_BAUD.spec,
    &P2_ECHO_CHAR.spec,
    &P2_FLOW_CTL.spec,
    &P2_STRIP_B7.spec,
    &SYNC_PPS.spec,
    &IDLE_TIMER.spec,
    &VERBOSE.spec,
    &PROMPT.spec,
    &CM_WAKE_HIB.spec,
    &CM_FAST_WAKE.spec,
    &CP_BOARD.spec,
    &AC_DATA.spec,
    &AC_STATS.spec,
    &RING_BUF.spec,
    &SUB_BLKS.spec,
    &LOG_MODE.spec,
    &SENTINEL.spec,
    &CHR_COUNT.spec,
    &LOG_STORE.spec,
    &DATA_RETRY.spec,
    &AC_RSP_TM_OUT.spec,
    &OP_MODE.spec,
    &DEV_ENABLE.spec,
    &FWD_DELAY.spec,
    &LOCAL_ADDR.spec,
    &REMOTE_ADDR.spec,
    &SHOW_BAD_DATA.spec,
    &START_TONES.spec,
    &TX_RATE.spec,
    &TX_POWER.spec,
    &WAKE_TONES.spec,
    &PRINT_HEX.spec,
    &STRICT_AT.spec,
    &INPUT_MODE.spec,
    &TIMED_RELEASE.spec,
    &T_PORT_MODE.spec,
    &SRC_P1.spec,
    &SRC_P2.spec,
    &DST1.spec,
    &DST2.spec,
    &SIM_AC_DLY.spec,
    &PKT_ECHO.spec,
    &PKT_SIZE.spec,
    &RCV_ALL.spec,
    &RX_FREQ.spec,
    &RX_THRESH.spec,
    &RX_TONE_DUR.spec,
    &RX_LOCKOUT.spec,
    &TX_TONE_DUR.spec,
    &TAT.spec,
];

/// Look a parameter up by name or keyword, ignoring case and a leading `@`
pub fn find(name: &str) -> Option<&'static ParameterSpec> {
    let name = name.trim_start_matches('@');
    ALL.iter()
        .copied()
        .find(|spec| spec.name.eq_ignore_ascii_case(name))
}

/// Character echo setting of the serial port the host is cabled to.
///
/// Replies carry the echoed command line while it is on.
pub fn echo_char(port: HostPort) -> &'static Param<Enable> {
    match port {
        HostPort::P1 => &P1_ECHO_CHAR,
        HostPort::P2 => &P2_ECHO_CHAR,
    }
}
