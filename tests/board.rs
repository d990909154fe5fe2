mod common;

use std::time::Duration;

use common::{SimRadio, TestBoard};
use spi_lora::registers::Version;
use spi_lora::{Board, BoardSession, Error, Modem};

#[test]
fn session_tears_down_on_drop() {
    let board = TestBoard::new(SimRadio::new());
    let log = board.log.clone();

    let session = BoardSession::setup(board).unwrap();
    assert_eq!(log.lock().unwrap().teardowns, 0);
    drop(session);

    let log = log.lock().unwrap();
    assert_eq!(log.setups, 1);
    assert_eq!(log.teardowns, 1);
}

#[test]
fn failed_setup_still_tears_down() {
    let mut board = TestBoard::new(SimRadio::new());
    board.fail_setup = true;
    let log = board.log.clone();

    assert!(matches!(BoardSession::setup(board), Err(Error::Board(_))));
    assert_eq!(log.lock().unwrap().teardowns, 1);
}

#[test]
fn early_return_tears_down() {
    let radio = SimRadio::new();
    radio.state().failing_reads.insert(0x42);
    let board = TestBoard::new(radio);
    let log = board.log.clone();

    fn version(board: TestBoard) -> Result<Version, Error> {
        let mut session = BoardSession::setup(board)?;
        let spi = session.open_transport(0, 0)?;
        let mut modem = Modem::new(spi, session.is_low_band_frontend())?;
        modem.get_version()
    }

    assert!(version(board).is_err());
    assert_eq!(log.lock().unwrap().teardowns, 1);
}

#[test]
fn default_blink_ends_with_the_led_off() {
    let mut board = TestBoard::new(SimRadio::new());

    board.blink(Duration::ZERO, 2);
    board.blink(Duration::ZERO, 0);

    assert_eq!(
        board.log().leds,
        vec![true, false, true, false, true, false]
    );
}

#[test]
fn boards_without_interrupts_report_zero_lines() {
    let mut board = TestBoard::new(SimRadio::new());
    let (events, _receiver) = crossbeam_channel::unbounded();

    assert_eq!(board.register_interrupts(&events, true).unwrap(), 0);
    assert!(!board.led_off());
}
