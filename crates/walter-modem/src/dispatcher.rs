//! Response dispatcher and single-outstanding-command driver loop (spec
//! §4.3, §4.4).
//!
//! Ground: the overall consume/pass-through handler shape and the
//! retry-on-`ERROR`/`+CME ERROR` rule are ported from
//! `core.py::_process_queue_rsp`; the attempt/timeout arithmetic from
//! `core.py::_process_queue_cmd`. The reader loop and the dispatcher loop are
//! merged into a single cooperative task here rather than two independently
//! spawned tasks sharing a split UART -- `select`ing between "bytes arrived"
//! and "a new task-queue item arrived" preserves the same ordering
//! guarantees (spec §9: "either mapping preserves §5's ordering guarantees
//! so long as the task queue is a FIFO and the dispatcher is the sole
//! consumer") without requiring the HAL to hand out two independently owned
//! halves of the same peripheral.

use embassy_futures::select::{select3, Either3};
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;

use crate::command::{CmdState, Command, CommandKind, CompletionSlots};
use crate::config::{APP_HANDLER_CAPACITY, CMD_TIMEOUT};
use crate::error::{ModemResult, WalterError};
use crate::handlers::CORE_HANDLERS;
use crate::hal::{UartReader, UartWriter};
use crate::log::{my_debug, my_warn};
use crate::mirror::{Mirror, NetworkStateView};
use crate::parser::{RawChunkArming, ResponseParser};
use crate::queue::{CommandQueue, TaskQueue, TaskQueueItem};
use crate::response::ModemResponse;

/// What a handler reports back about the frame it just inspected (spec
/// §4.4: "returns one of {consume-as-Ok, consume-as-Error, consume-as-Retry,
/// pass-through}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    ConsumeOk,
    ConsumeError,
    ConsumeRetry,
    PassThrough,
}

/// The shape every response handler has, core or application-registered.
/// A plain function pointer rather than a trait object: the handler
/// registry is open-ended (spec §9 design note) but never needs captured
/// state, so `fn` avoids pulling in `dyn` and the vtable/allocation it would
/// need in a no-alloc build.
pub type HandlerFn = fn(&[u8], &mut Mirror, &mut ModemResponse) -> HandlerOutcome;

/// Application-registered handlers, keyed by a static prefix (spec §4.4 step
/// 2). Guarded by the same mutex shape as [`CompletionSlots`] since
/// registration can be called from any task while the dispatcher reads the
/// table on every frame.
pub struct AppHandlerTable {
    inner: embassy_sync::blocking_mutex::Mutex<
        embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
        core::cell::RefCell<Vec<(&'static [u8], HandlerFn), APP_HANDLER_CAPACITY>>,
    >,
}

impl AppHandlerTable {
    pub const fn new() -> Self {
        Self {
            inner: embassy_sync::blocking_mutex::Mutex::new(core::cell::RefCell::new(Vec::new())),
        }
    }

    pub fn register(&self, prefix: &'static [u8], handler: HandlerFn) -> Result<(), WalterError> {
        self.inner.lock(|cell| {
            cell.borrow_mut()
                .push((prefix, handler))
                .map_err(|_| WalterError::BufferFull)
        })
    }

    pub fn unregister(&self, prefix: &'static [u8]) {
        self.inner.lock(|cell| {
            let mut table = cell.borrow_mut();
            if let Some(pos) = table.iter().position(|(p, _)| *p == prefix) {
                table.swap_remove(pos);
            }
        });
    }

    fn dispatch(&self, frame: &[u8], mirror: &mut Mirror, response: &mut ModemResponse) -> Option<HandlerOutcome> {
        self.inner.lock(|cell| {
            let table = cell.borrow();
            table
                .iter()
                .find(|(prefix, _)| frame.starts_with(prefix))
                .map(|(_, handler)| handler(frame, mirror, response))
        })
    }
}

impl Default for AppHandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the reader+dispatcher loop for one modem instance.
pub struct Dispatcher<'a, R, W, const SLOTS: usize> {
    reader: R,
    writer: W,
    parser: ResponseParser,
    mirror: Mirror,
    current: Option<Command>,
    pending: CommandQueue,
    last_response: Option<ModemResponse>,
    tasks: &'a TaskQueue,
    app_handlers: &'a AppHandlerTable,
    slots: &'a CompletionSlots<SLOTS>,
    network_view: &'a NetworkStateView,
}

impl<'a, R, W, const SLOTS: usize> Dispatcher<'a, R, W, SLOTS>
where
    R: UartReader,
    W: UartWriter,
{
    pub fn new(
        reader: R,
        writer: W,
        tasks: &'a TaskQueue,
        app_handlers: &'a AppHandlerTable,
        slots: &'a CompletionSlots<SLOTS>,
        network_view: &'a NetworkStateView,
    ) -> Self {
        Self {
            reader,
            writer,
            parser: ResponseParser::new(),
            mirror: Mirror::new(),
            current: None,
            pending: CommandQueue::new(),
            last_response: None,
            tasks,
            app_handlers,
            slots,
            network_view,
        }
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut Mirror {
        &mut self.mirror
    }

    /// Runs forever, interleaving incoming UART bytes with task-queue items
    /// (spec §4.3 steps 1-5).
    pub async fn run(&mut self) -> ! {
        let mut buf = [0u8; 64];
        loop {
            if self.current.is_none() {
                if let Some(cmd) = self.pending.pop_front() {
                    self.current = Some(cmd);
                    self.transmit_current().await;
                }
            }

            match select3(
                self.tasks.receive(),
                self.reader.read_available(&mut buf),
                self.deadline_sleep(),
            )
            .await
            {
                Either3::First(item) => self.handle_task_item(item).await,
                Either3::Second(Ok(0)) => {}
                Either3::Second(Ok(n)) => self.feed_bytes(&buf[..n]).await,
                Either3::Second(Err(_)) => {
                    my_warn!("dispatcher", "UART read error");
                }
                Either3::Third(()) => {}
            }

            self.check_timeout().await;
        }
    }

    /// Sleeps until the current command's per-attempt deadline (spec P5),
    /// or forever if no command is outstanding. Gives `run`'s select a third
    /// arm so the deadline fires promptly even while the UART stays silent,
    /// instead of only being noticed opportunistically after other traffic
    /// wakes the loop.
    async fn deadline_sleep(&self) {
        match self.current.as_ref() {
            Some(cmd) => {
                let elapsed = Instant::now().duration_since(cmd.attempt_start);
                let remaining_ticks = CMD_TIMEOUT.as_ticks().saturating_sub(elapsed.as_ticks());
                Timer::after(Duration::from_ticks(remaining_ticks)).await;
            }
            None => core::future::pending::<()>().await,
        }
    }

    async fn handle_task_item(&mut self, item: TaskQueueItem) {
        match item {
            TaskQueueItem::NewCommand(cmd) => {
                if self.current.is_none() {
                    self.current = Some(cmd);
                    self.transmit_current().await;
                } else if self.pending.push_back(cmd).is_err() {
                    my_warn!("dispatcher", "command queue full, dropping submission");
                }
            }
            TaskQueueItem::ParsedFrame(frame) => self.dispatch_frame(&frame).await,
            TaskQueueItem::ResetMirror(slot) => {
                self.mirror.reset();
                self.network_view.set(self.mirror.network);
                self.slots.signal(slot, ModemResult::Ok, ModemResponse::new());
            }
        }
    }

    async fn feed_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let http = &self.mirror.http;
            let frame = self.parser.feed(byte, || {
                http.armed_raw_context()
                    .map(|entry| RawChunkArming { content_length: entry.content_length })
            });
            match frame {
                Ok(Some(frame)) => self.dispatch_frame(&frame).await,
                Ok(None) => {}
                Err(_) => my_warn!("dispatcher", "line buffer full, dropping byte"),
            }
        }
    }

    async fn dispatch_frame(&mut self, frame: &[u8]) {
        my_debug!("dispatcher", "frame: {} bytes", frame.len());

        // The interactive prompt that precedes a send-with-follow-up-data
        // payload is handled ahead of the handler tables: it belongs to the
        // in-flight command's transmit sequence, not to mirror state.
        if frame.first() == Some(&b'>') {
            if let Some(cmd) = self.current.as_mut() {
                if cmd.kind == CommandKind::SendWithFollowUpData && cmd.awaiting_prompt {
                    cmd.awaiting_prompt = false;
                    if let Some(payload) = cmd.payload.clone() {
                        let _ = self.writer.write_all(&payload).await;
                    }
                    if let Some(cmd) = self.current.as_mut() {
                        cmd.attempt_start = Instant::now();
                    }
                    return;
                }
            }
        }

        let mut response = ModemResponse::new();
        let mut outcome = None;
        for (prefix, handler) in CORE_HANDLERS {
            if frame.starts_with(prefix) {
                outcome = Some(handler(frame, &mut self.mirror, &mut response));
                break;
            }
        }
        if outcome.is_none() {
            outcome = self.app_handlers.dispatch(frame, &mut self.mirror, &mut response);
        }
        let outcome = outcome.unwrap_or(HandlerOutcome::PassThrough);

        // Publish the network/op/SIM snapshot every frame, not just on a
        // `+CEREG`/`+CFUN` match: cheap (three small enums) and keeps
        // external readers (spec §4.5 "synchronous accessors") from ever
        // observing a stale value between a handler's mutation and here.
        self.network_view.set(self.mirror.network);

        let prefix_matches = self
            .current
            .as_ref()
            .is_some_and(|cmd| cmd.expected.matches(frame));

        match outcome {
            HandlerOutcome::ConsumeRetry => {
                if let Some(cmd) = self.current.as_mut() {
                    cmd.state = CmdState::RetryAfterError;
                }
                self.last_response = Some(response);
            }
            HandlerOutcome::ConsumeOk if prefix_matches => {
                self.complete_current(ModemResult::Ok, response).await;
            }
            HandlerOutcome::ConsumeError if prefix_matches => {
                let result = response.result;
                self.complete_current(result, response).await;
            }
            HandlerOutcome::PassThrough if prefix_matches => {
                self.complete_current(ModemResult::Ok, response).await;
            }
            _ => {}
        }
    }

    async fn transmit_current(&mut self) {
        let (kind, slot) = match self.current.as_mut() {
            Some(cmd) => {
                cmd.attempt += 1;
                cmd.attempt_start = Instant::now();
                cmd.state = CmdState::Pending;
                (cmd.kind, cmd.completion_slot)
            }
            None => return,
        };
        // A response captured on a prior attempt (e.g. a CME error that
        // triggered this retry) must not survive into a later attempt's
        // outcome -- a silent timeout on the next attempt would otherwise
        // report that stale payload instead of `NoData`.
        self.last_response = None;

        match kind {
            CommandKind::WaitOnly => {}
            CommandKind::SendWithFollowUpData => {
                if let Some(cmd) = self.current.as_mut() {
                    cmd.awaiting_prompt = true;
                }
                if let Some(cmd) = self.current.as_ref() {
                    let _ = self.writer.write_all(&cmd.at_cmd).await;
                }
                let _ = self.writer.write_all(b"\n").await;
            }
            CommandKind::SendOnly | CommandKind::SendAndWait => {
                if let Some(cmd) = self.current.as_ref() {
                    let _ = self.writer.write_all(&cmd.at_cmd).await;
                }
                let _ = self.writer.write_all(b"\r\n").await;
                if kind == CommandKind::SendOnly {
                    self.slots.signal(slot, ModemResult::Ok, ModemResponse::new());
                    self.current = None;
                }
            }
        }
    }

    async fn check_timeout(&mut self) {
        let Some(cmd) = self.current.as_ref() else {
            return;
        };
        let retry_after_error = cmd.state == CmdState::RetryAfterError;
        let timed_out = Instant::now().duration_since(cmd.attempt_start) >= CMD_TIMEOUT;
        if !retry_after_error && !timed_out {
            return;
        }

        let attempt = cmd.attempt;
        let max_attempts = cmd.max_attempts;

        if attempt < max_attempts {
            self.transmit_current().await;
        } else {
            let result = if retry_after_error { ModemResult::Error } else { ModemResult::Timeout };
            let response = self.last_response.take().unwrap_or_else(|| ModemResponse {
                result,
                ..ModemResponse::new()
            });
            self.complete_current(result, response).await;
        }
    }

    async fn complete_current(&mut self, result: ModemResult, response: ModemResponse) {
        if let Some(cmd) = self.current.take() {
            self.last_response = None;
            self.slots.signal(cmd.completion_slot, result, response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandKind, ExpectedPrefixes};
    use crate::config::COMMAND_SLOT_COUNT;
    use crate::hal::test_support::LoopbackUart;
    use futures::executor::block_on;
    use heapless::Vec as HVec;

    static TASKS: TaskQueue = TaskQueue::new();
    static SLOTS: CompletionSlots<COMMAND_SLOT_COUNT> = CompletionSlots::new();
    static APP_HANDLERS: AppHandlerTable = AppHandlerTable::new();
    static NETWORK_VIEW: crate::mirror::NetworkStateView = crate::mirror::NetworkStateView::new();

    fn at_cmd(bytes: &[u8]) -> HVec<u8, 256> {
        HVec::from_slice(bytes).unwrap()
    }

    // Requires the `std` feature for `embassy-time`'s std-backed clock.
    #[test]
    fn ok_round_trip_completes_current_command() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            let slot = SLOTS.lease().unwrap();
            let cmd = Command::new(
                at_cmd(b"AT"),
                CommandKind::SendAndWait,
                ExpectedPrefixes::single(b"OK"),
                3,
                slot,
            );
            dispatcher.current = Some(cmd);
            dispatcher.transmit_current().await;

            dispatcher.feed_bytes(b"\r\nOK\r\n").await;

            let (result, _response) = SLOTS.wait(slot).await;
            assert_eq!(result, ModemResult::Ok);
            assert!(dispatcher.current.is_none());
            SLOTS.release(slot);
        });
    }

    #[test]
    fn reset_mirror_zeroes_state_and_signals_the_waiting_slot() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            dispatcher.mirror_mut().network.op_state = crate::response::OpState::Full;
            let slot = SLOTS.lease().unwrap();
            dispatcher.handle_task_item(TaskQueueItem::ResetMirror(slot)).await;

            assert_eq!(dispatcher.mirror().network.op_state, crate::response::OpState::Minimum);
            let (result, _) = SLOTS.wait(slot).await;
            assert_eq!(result, ModemResult::Ok);
            assert_eq!(NETWORK_VIEW.get().op_state, crate::response::OpState::Minimum);
            SLOTS.release(slot);
        });
    }

    #[test]
    fn cme_error_marks_retry_and_eventually_completes_with_error() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            let slot = SLOTS.lease().unwrap();
            let cmd = Command::new(
                at_cmd(b"AT+CPIN=0000"),
                CommandKind::SendAndWait,
                ExpectedPrefixes::single(b"OK"),
                1,
                slot,
            );
            dispatcher.current = Some(cmd);
            dispatcher.transmit_current().await;

            dispatcher.feed_bytes(b"\r\n+CME ERROR: 16\r\n").await;
            assert_eq!(
                dispatcher.current.as_ref().unwrap().state,
                CmdState::RetryAfterError
            );

            dispatcher.check_timeout().await;

            let (result, response) = SLOTS.wait(slot).await;
            assert_eq!(result, ModemResult::Error);
            assert!(matches!(
                response.payload,
                crate::response::ResponsePayload::CmeError(crate::error::CmeError::IncorrectPassword)
            ));
            SLOTS.release(slot);
        });
    }

    /// Scenario S3: an HTTP body armed via `+SQNHTTPRING` and framed by the
    /// parser's `<<<` marker lands in the mirror and the profile returns to
    /// Idle, independent of any current command.
    #[test]
    fn http_body_is_framed_and_profile_returns_to_idle() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            let id = crate::types::HttpProfileId::try_from(0).unwrap();
            {
                let entry = dispatcher.mirror_mut().http.get_mut(id);
                entry.state = crate::mirror::http::HttpCtxState::GotRing;
                entry.http_status = 200;
                entry.content_length = 5;
            }
            dispatcher.mirror_mut().http.current_profile = Some(id);

            dispatcher.feed_bytes(b"\r\n<<<hello\r\nOK\r\n").await;

            let entry = dispatcher.mirror().http.get(id);
            assert_eq!(entry.state, crate::mirror::http::HttpCtxState::Idle);
            assert!(dispatcher.mirror().http.current_profile.is_none());
        });
    }

    /// Scenario S4: a send-with-follow-up-data command writes its payload
    /// only after the modem's interactive prompt arrives, then completes on
    /// the terminal `OK`.
    #[test]
    fn prompt_then_payload_completes_the_command() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            let slot = SLOTS.lease().unwrap();
            let cmd = Command::new(
                at_cmd(b"AT+SQNSSENDEXT=1,3,0"),
                CommandKind::SendWithFollowUpData,
                ExpectedPrefixes::single(b"OK"),
                1,
                slot,
            )
            .with_payload(at_cmd(b"abc"));
            dispatcher.current = Some(cmd);
            dispatcher.transmit_current().await;
            assert!(dispatcher.current.as_ref().unwrap().awaiting_prompt);

            dispatcher.feed_bytes(b"\r\n> ").await;
            assert!(!dispatcher.current.as_ref().unwrap().awaiting_prompt);

            dispatcher.feed_bytes(b"\r\nOK\r\n").await;
            let (result, _) = SLOTS.wait(slot).await;
            assert_eq!(result, ModemResult::Ok);
            assert!(dispatcher.current.is_none());
            SLOTS.release(slot);
        });
    }

    /// Scenario S5: a `+CEREG` URC arriving between a command's
    /// transmission and its terminal response updates the registration
    /// mirror without completing the unrelated current command, which
    /// completes only once its own `+CSQ` line arrives.
    #[test]
    fn urc_interleaved_with_command_updates_mirror_without_completing_it() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            let slot = SLOTS.lease().unwrap();
            let cmd = Command::new(
                at_cmd(b"AT+CSQ"),
                CommandKind::SendAndWait,
                ExpectedPrefixes::single(b"+CSQ"),
                3,
                slot,
            );
            dispatcher.current = Some(cmd);
            dispatcher.transmit_current().await;

            dispatcher
                .feed_bytes(b"\r\n+CEREG: 5\r\n\r\n+CSQ: 15,99\r\n\r\nOK\r\n")
                .await;

            assert_eq!(
                dispatcher.mirror().network.reg_state,
                crate::response::RegState::Roaming
            );
            let (result, response) = SLOTS.wait(slot).await;
            assert_eq!(result, ModemResult::Ok);
            assert!(matches!(response.payload, crate::response::ResponsePayload::Rssi(-83)));
            SLOTS.release(slot);
        });
    }

    /// Scenario S6: a `+LPGNSSFIXREADY` frame fans the fix out to every
    /// registered waiter and empties the waiter table, independent of any
    /// current command. [`GnssFixWaiter::wait`] itself is exercised directly
    /// against the mirror table in `mirror/gnss.rs`'s
    /// `deliver_and_clear_empties_the_table` test; here the frame only
    /// needs to reach `deliver_and_clear` through the parser and handler
    /// table intact.
    #[test]
    fn gnss_fix_frame_drains_the_waiter_table() {
        block_on(async {
            let uart = LoopbackUart::new();
            let writer = LoopbackUart::new();
            let mut dispatcher: Dispatcher<'_, _, _, COMMAND_SLOT_COUNT> =
                Dispatcher::new(uart, writer, &TASKS, &APP_HANDLERS, &SLOTS, &NETWORK_VIEW);

            dispatcher.mirror_mut().gnss.register().unwrap();
            dispatcher.mirror_mut().gnss.register().unwrap();
            assert_eq!(dispatcher.mirror().gnss.len(), 2);

            dispatcher
                .feed_bytes(b"\r\n+LPGNSSFIXREADY: 1,0,0,0,1,2,3,0,0,0\r\n")
                .await;

            assert!(dispatcher.mirror().gnss.is_empty());
        });
    }
}
