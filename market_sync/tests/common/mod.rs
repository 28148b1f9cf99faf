#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use market_common::{Quote, Result, Snapshot};
use market_sync::{CancelToken, QuoteSource, SyncState};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn snapshot_of(symbols: &[String], price: f64, as_of: DateTime<Utc>) -> Snapshot {
    Snapshot::new(
        symbols
            .iter()
            .map(|s| Quote::new(s.clone(), price, 100.0, as_of)),
        as_of,
        "scripted",
    )
}

/// Observed call to a [`ScriptedSource`].
#[derive(Debug, Clone)]
pub struct Call {
    pub index: usize,
    pub symbols: Vec<String>,
    pub cancelled_on_return: bool,
}

type Script = dyn Fn(usize, &[String], &CancelToken) -> Result<Snapshot> + Send + Sync;

/// Source whose behaviour per call is a closure of the call index.
pub struct ScriptedSource {
    script: Box<Script>,
    calls: Arc<Mutex<Vec<Call>>>,
    finished_tx: Sender<usize>,
}

impl ScriptedSource {
    pub fn new<F>(script: F) -> (Self, Arc<Mutex<Vec<Call>>>, Receiver<usize>)
    where
        F: Fn(usize, &[String], &CancelToken) -> Result<Snapshot> + Send + Sync + 'static,
    {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (finished_tx, finished_rx) = unbounded();
        let source = Self {
            script: Box::new(script),
            calls: Arc::clone(&calls),
            finished_tx,
        };
        (source, calls, finished_rx)
    }
}

impl QuoteSource for ScriptedSource {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, symbols: &[String], cancel: &CancelToken) -> Result<Snapshot> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len() + 1;
            calls.push(Call {
                index,
                symbols: symbols.to_vec(),
                cancelled_on_return: false,
            });
            index
        };
        let result = (self.script)(index, symbols, cancel);
        if let Some(call) = self
            .calls
            .lock()
            .unwrap()
            .iter_mut()
            .find(|c| c.index == index)
        {
            call.cancelled_on_return = cancel.is_cancelled();
        }
        let _ = self.finished_tx.send(index);
        result
    }
}

/// Callback that forwards every published state to a channel.
pub fn state_channel() -> (impl Fn(&SyncState) + Send + 'static, Receiver<SyncState>) {
    let (tx, rx) = unbounded::<SyncState>();
    (move |state: &SyncState| {
        let _ = tx.send(state.clone());
    }, rx)
}

/// Wait for the first state matching `pred`, skipping the others.
pub fn wait_for<P>(rx: &Receiver<SyncState>, pred: P) -> SyncState
where
    P: Fn(&SyncState) -> bool,
{
    loop {
        match rx.recv_timeout(WAIT) {
            Ok(state) if pred(&state) => return state,
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for state"),
            Err(RecvTimeoutError::Disconnected) => panic!("state channel closed"),
        }
    }
}

/// Minimal HTTP/1.1 server answering each request from `handler(path_and_query)`.
pub struct FakeUpstream {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeUpstream {
    pub fn start<H>(handler: H) -> Self
    where
        H: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                thread::spawn(move || serve(stream, handler.as_ref(), &log));
            }
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve<H>(stream: TcpStream, handler: &H, log: &Mutex<Vec<String>>)
where
    H: Fn(&str) -> (u16, String) + ?Sized,
{
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => continue,
            Err(_) => return,
        }
    }

    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    log.lock().unwrap().push(target.clone());

    let (code, body) = handler(&target);
    let reason = match code {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Other",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        code,
        reason,
        body.len(),
        body
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Value of query parameter `name` in `target`.
pub fn query_param(target: &str, name: &str) -> Option<String> {
    let query = target.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
