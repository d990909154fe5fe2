mod common;

use std::io::{self, Write};
use std::time::Duration;

use common::{BusAccess, SimRadio, TestBoard};
use spi_lora::registers::{addr, IrqFlags};
use spi_lora::rx::RxState;
use spi_lora::{BoardEvent, DioLine, Error, Mode, Modem, RxLoop};

fn setup(irq_lines: usize) -> (SimRadio, TestBoard, Modem<SimRadio>) {
    let radio = SimRadio::new();
    let mut board = TestBoard::new(radio.clone());
    board.irq_lines = irq_lines;
    let mut modem = Modem::new(radio.clone(), false).unwrap();
    modem.set_dio_mapping([0; 6]).unwrap();
    (radio, board, modem)
}

/// FIFO reads only happen while the modem sleeps between RX_DONE and re-arm.
fn assert_drained_while_asleep(log: &[BusAccess]) {
    let mut asleep = false;
    for access in log {
        match *access {
            BusAccess::Write(addr::OP_MODE, value) => asleep = value & 0x07 == 0x00,
            BusAccess::Read(addr::FIFO) => assert!(asleep, "FIFO read while receiving"),
            _ => {}
        }
    }
}

#[test]
fn polled_loop_handles_back_to_back_packets() {
    let (radio, mut board, mut modem) = setup(0);
    radio.receive(b"first");
    radio.receive(b"second");
    let (_events, receiver) = crossbeam_channel::unbounded();
    let mut out = Vec::new();

    let mut rx = RxLoop::new(&mut board, receiver, 0, &mut out);
    rx.arm(&mut modem).unwrap();
    assert_eq!(rx.state(), RxState::Armed);
    assert!(!rx.irq_events_available());
    rx.on_tick(&mut modem).unwrap();
    rx.on_tick(&mut modem).unwrap();
    let stats = rx.stats();
    drop(rx);

    assert_eq!(stats.packets, 2);
    assert_eq!(stats.ticks, 2);
    let text = String::from_utf8(out).unwrap();
    let first = text.find("Payload decodes to: \"first\"").unwrap();
    let second = text.find("Payload decodes to: \"second\"").unwrap();
    assert!(first < second);
    assert!(text.contains("Payload is 6 bytes"));
    assert!(text.contains(&format!("\r{} 0 0", 0x40 - 157)));

    let state = radio.state();
    // construction, arm, then SLEEP / RXCONT per packet
    assert_eq!(
        state.op_mode_writes(),
        vec![0x80, 0x81, 0x85, 0x80, 0x85, 0x80, 0x85]
    );
    assert_drained_while_asleep(&state.log);
    assert_eq!(board.log().leds, vec![true, false, true, false]);
}

#[test]
fn event_loop_dispatches_on_dio_edges_and_stops() {
    let (radio, mut board, mut modem) = setup(1);
    radio.receive(b"ping");
    radio.receive(b"pong");
    let (events, receiver) = crossbeam_channel::unbounded();
    events.send(BoardEvent::Dio(DioLine::Dio0)).unwrap();
    events.send(BoardEvent::Switch).unwrap();
    events.send(BoardEvent::Dio(DioLine::Dio0)).unwrap();
    events.send(BoardEvent::Stop).unwrap();
    let mut out = Vec::new();

    let stats = RxLoop::new(&mut board, receiver, 1, &mut out)
        .with_tick(Duration::from_secs(60))
        .run(&mut modem)
        .unwrap();

    assert_eq!(stats.packets, 2);
    assert_eq!(stats.ticks, 0);
    assert_eq!(modem.mode(), Some(Mode::Sleep));
    assert_eq!(radio.state().op_mode_writes().last(), Some(&0x80));
    assert_drained_while_asleep(&radio.state().log);
}

#[test]
fn ticks_do_not_poll_when_dio_lines_are_wired() {
    let (radio, mut board, mut modem) = setup(1);
    radio.receive(b"late");
    let (_events, receiver) = crossbeam_channel::unbounded();
    let mut out = Vec::new();

    let mut rx = RxLoop::new(&mut board, receiver, 1, &mut out);
    rx.arm(&mut modem).unwrap();
    rx.on_tick(&mut modem).unwrap();
    assert_eq!(rx.stats().packets, 0);
    assert!(radio.state().irq_flags().contains(IrqFlags::RX_DONE));

    let flow = rx
        .handle_event(&mut modem, BoardEvent::Dio(DioLine::Dio0))
        .unwrap();
    assert!(flow.is_continue());
    assert_eq!(rx.stats().packets, 1);
}

#[test]
fn corrupted_packet_is_counted_and_dropped() {
    let (radio, mut board, mut modem) = setup(0);
    radio.receive_corrupted(b"junk");
    let (_events, receiver) = crossbeam_channel::unbounded();
    let mut out = Vec::new();

    let mut rx = RxLoop::new(&mut board, receiver, 0, &mut out);
    rx.arm(&mut modem).unwrap();
    rx.on_tick(&mut modem).unwrap();
    let stats = rx.stats();
    drop(rx);

    assert_eq!(stats.packets, 0);
    assert_eq!(stats.crc_errors, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("Payload decodes to"));
    assert_eq!(radio.state().op_mode_writes().last(), Some(&0x85));
}

#[test]
fn closed_event_channel_ends_the_loop() {
    let (radio, mut board, mut modem) = setup(1);
    let (events, receiver) = crossbeam_channel::unbounded::<BoardEvent>();
    drop(events);

    let stats = RxLoop::new(&mut board, receiver, 1, Vec::new())
        .run(&mut modem)
        .unwrap();

    assert_eq!(stats.packets, 0);
    assert_eq!(
        radio.state().op_mode_writes(),
        vec![0x80, 0x81, 0x85, 0x80]
    );
}

#[test]
fn bus_noise_in_a_handler_does_not_end_the_loop() {
    let (radio, mut board, mut modem) = setup(1);
    radio.receive(b"lost");
    radio.receive(b"kept");
    radio.state().failing_once.insert(addr::FIFO_RX_CURR_ADDR);
    let (events, receiver) = crossbeam_channel::unbounded();
    events.send(BoardEvent::Dio(DioLine::Dio0)).unwrap();
    events.send(BoardEvent::Dio(DioLine::Dio0)).unwrap();
    events.send(BoardEvent::Stop).unwrap();
    let mut out = Vec::new();

    let stats = RxLoop::new(&mut board, receiver, 1, &mut out)
        .run(&mut modem)
        .unwrap();

    assert_eq!(stats.bus_errors, 1);
    assert_eq!(stats.packets, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Payload decodes to: \"kept\""));
    assert!(!text.contains("lost"));
    assert_eq!(modem.mode(), Some(Mode::Sleep));
    // the LED does not stay on after the failed packet
    assert_eq!(board.log().leds, vec![true, false, true, false]);
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::ErrorKind::BrokenPipe.into())
    }
}

#[test]
fn modem_sleeps_after_a_failed_loop() {
    let (radio, mut board, mut modem) = setup(1);
    radio.receive(b"unreported");
    let (events, receiver) = crossbeam_channel::unbounded();
    events.send(BoardEvent::Dio(DioLine::Dio0)).unwrap();

    let result = RxLoop::new(&mut board, receiver, 1, BrokenPipe).run(&mut modem);

    assert!(matches!(result, Err(Error::Io(_))));
    assert_eq!(modem.mode(), Some(Mode::Sleep));
    assert_eq!(radio.state().op_mode_writes().last(), Some(&0x80));
}
