use std::io::Write as _;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use env_logger::Target;
use log::{info, trace, warn};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use arc_core::manager::{CreateStreamParams, DeliverOutcome};
use arc_core::{InMemoryKeyProvider, MediaKind, StreamManager, StreamState};
use arc_rtp::header::Header;
use arc_rtp::packet::Packet as RtpPacket;
use arc_shared::config::ArcConfig;
use bytes::Bytes;

const SSRC: u32 = 0x4172_6331; // "Arc1"
const KEY_ID: &str = "loopback-demo";
const AUDIO_STEP_SAMPLES: u32 = 960; // 20ms @ 48kHz, matches Scenario A
const STATS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "loopback")]
#[command(about = "Demonstrates a clean two-peer loopback over the arc media transport core.")]
struct Cli {
    #[arg(long, default_value_t = format!("127.0.0.1"))]
    host: String,
    #[arg(long, default_value_t = 0)]
    send_port: u16,
    #[arg(long, default_value_t = 0)]
    recv_port: u16,
    #[arg(long, default_value_t = false)]
    encrypt: bool,
    #[arg(long, default_value_t = format!("info"))]
    log_level: String,
    #[arg(long, default_value_t = 20)]
    packet_interval_ms: u64,
}

fn init_logging(log_level: &str) -> Result<()> {
    let level = log::LevelFilter::from_str(log_level)?;
    env_logger::Builder::new()
        .target(Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%H:%M:%S.%3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let (stop_tx, _) = broadcast::channel::<()>(1);
    let stop_tx_for_handler = stop_tx.clone();
    println!("Press Ctrl-C to stop");
    ctrlc::set_handler(move || {
        let _ = stop_tx_for_handler.send(());
    })?;

    run(cli, stop_tx.subscribe()).await
}

fn build_manager(encrypt: bool) -> Result<StreamManager<InMemoryKeyProvider>> {
    let key_provider = InMemoryKeyProvider::new();
    if encrypt {
        key_provider.put(KEY_ID, &[7u8; 16], &[9u8; 12])?;
    }
    let mut mgr = StreamManager::new(ArcConfig::default(), key_provider)?;
    let now = Instant::now();
    mgr.open_session("loopback-session", "local", "remote", now);
    mgr.establish_session("loopback-session")?;
    mgr.create_stream(
        "loopback-session",
        "loopback-stream",
        CreateStreamParams {
            ssrc: SSRC,
            kind: MediaKind::Audio,
            payload_type: 111,
            codec: "opus".into(),
            encryption_enabled: encrypt,
            key_id: KEY_ID.into(),
        },
    )?;
    mgr.update_state("loopback-stream", StreamState::Active)?;
    Ok(mgr)
}

async fn run(cli: Cli, mut stop_rx: broadcast::Receiver<()>) -> Result<()> {
    let recv_socket = UdpSocket::bind(format!("{}:{}", cli.host, cli.recv_port)).await?;
    let send_socket = UdpSocket::bind(format!("{}:{}", cli.host, cli.send_port)).await?;
    let recv_addr = recv_socket.local_addr()?;
    send_socket.connect(recv_addr).await?;
    info!("sender bound to {}, sending to {recv_addr}", send_socket.local_addr()?);

    let tx_manager = Arc::new(Mutex::new(build_manager(cli.encrypt)?));
    let rx_manager = Arc::new(Mutex::new(build_manager(cli.encrypt)?));

    let sender = tokio::spawn(sender_loop(send_socket, tx_manager.clone(), cli.packet_interval_ms));
    let receiver = tokio::spawn(receiver_loop(recv_socket, rx_manager.clone()));

    let mut stats_timer = tokio::time::interval(STATS_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => {
                info!("shutting down");
                break;
            }
            _ = stats_timer.tick() => {
                print_stats(&rx_manager);
            }
        }
    }

    sender.abort();
    receiver.abort();
    print_stats(&rx_manager);
    Ok(())
}

fn print_stats(manager: &Arc<Mutex<StreamManager<InMemoryKeyProvider>>>) {
    let mgr = manager.lock().expect("stream manager lock poisoned");
    match mgr.get_stats("loopback-stream") {
        Ok(stats) => info!(
            "stats: received={} sent={} replayed={} auth_failed={} concealed={} loss={:.2}% jitter={:.2}ms rtt={:.2}ms bw={:.0}bps level={:?}",
            stats.packets_received,
            stats.packets_sent,
            stats.replayed,
            stats.auth_failed,
            stats.concealed,
            stats.loss_rate * 100.0,
            stats.jitter_ms,
            stats.rtt_ms,
            stats.bandwidth_estimate_bps,
            stats.quality_level,
        ),
        Err(e) => warn!("no stats yet: {e}"),
    }
}

async fn sender_loop(socket: UdpSocket, manager: Arc<Mutex<StreamManager<InMemoryKeyProvider>>>, interval_ms: u64) {
    let mut seq: u16 = 0;
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        ticker.tick().await;
        let packet = RtpPacket {
            header: Header {
                payload_type: 111,
                sequence_number: seq,
                timestamp: (seq as u32).wrapping_mul(AUDIO_STEP_SAMPLES),
                ssrc: SSRC,
                ..Default::default()
            },
            payload: Bytes::from_static(&[0xAAu8; 160]),
            padding: Bytes::new(),
        };
        seq = seq.wrapping_add(1);

        let sealed = {
            let mut mgr = manager.lock().expect("stream manager lock poisoned");
            match mgr.route_outbound("loopback-stream", &packet) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("failed to seal outbound packet: {e}");
                    continue;
                }
            }
        };

        if let Err(e) = socket.send(&sealed).await {
            warn!("socket send failed: {e}");
        }
    }
}

async fn receiver_loop(socket: UdpSocket, manager: Arc<Mutex<StreamManager<InMemoryKeyProvider>>>) {
    let mut buf = vec![0u8; 2048];
    let mut last_adapt_tick = Instant::now();
    loop {
        let (n, peer): (usize, SocketAddr) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!("socket recv failed: {e}");
                continue;
            }
        };
        trace!("received {n} bytes from {peer}");
        let now = Instant::now();
        {
            let mut mgr = manager.lock().expect("stream manager lock poisoned");
            if let Err(e) = mgr.route_inbound(&buf[..n], now) {
                warn!("dropping inbound packet: {e}");
                continue;
            }
            loop {
                match mgr.pop_stream("loopback-stream", now) {
                    Ok(DeliverOutcome::Delivered(_)) => continue,
                    Ok(DeliverOutcome::Concealed { seq, .. }) => {
                        trace!("concealed gap at seq {seq}");
                        continue;
                    }
                    Ok(DeliverOutcome::NotYet) => break,
                    Err(e) => {
                        warn!("pop_stream failed: {e}");
                        break;
                    }
                }
            }
            if now.duration_since(last_adapt_tick) >= Duration::from_millis(500) {
                let _ = mgr.tick_adapt("loopback-stream", now);
                last_adapt_tick = now;
            }
        }
    }
}
