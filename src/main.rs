use clap::{Arg, ArgMatches, Command};
use log::info;
use std::sync::Arc;
use std::time::Duration;
use std::{panic, process};
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureDevice, MicrophoneDevice, SyntheticDevice};
use crate::coach::WsCoachConnector;
use crate::config::{app_name, app_version, default_recording_dir, FRAME_HEIGHT, FRAME_WIDTH};
use crate::extract::{ExtractionRequest, HttpPoseExtractor, PoseExtractor};
use crate::overlay::{DisplayArea, OverlayOptions, OverlayRenderer, RecordingSurface};
use crate::pose::{
    catalog_for, closest_frame, evaluate, measure, peak_velocity, JointName, Sport,
};
use crate::pose::geometry::is_balanced;
use crate::session::{format_elapsed, SessionOrchestrator, SportContext};
use crate::storage::{HttpArtifactStore, HttpSessionStore};

pub mod capture;
pub mod coach;
pub mod config;
pub mod error;
pub mod extract;
pub mod overlay;
pub mod pose;
pub mod session;
pub mod storage;

fn sport_arg() -> Arg {
    Arg::new("sport")
        .short('s')
        .long("sport")
        .value_name("SPORT")
        .help("Sport context (basketball, tennis, golf, weightlifting, running, general).")
        .default_value("general")
}

fn cli() -> Command {
    Command::new(app_name())
        .version(app_version())
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand_required(true)
        .subcommand(
            Command::new("session")
                .about("Run a live coaching session until Ctrl-C or --duration elapses.")
                .arg(sport_arg())
                .arg(
                    Arg::new("skill")
                        .long("skill")
                        .value_name("SKILL")
                        .help("What the athlete is working on.")
                        .default_value("general practice"),
                )
                .arg(
                    Arg::new("analysis")
                        .long("analysis")
                        .value_name("FOCUS")
                        .help("Analysis focus for the coach.")
                        .default_value("technique"),
                )
                .arg(
                    Arg::new("coach-url")
                        .long("coach-url")
                        .value_name("URL")
                        .help("Websocket endpoint of the coaching backend.")
                        .required(true),
                )
                .arg(
                    Arg::new("artifact-url")
                        .long("artifact-url")
                        .value_name("URL")
                        .help("Base URL of the artifact store.")
                        .required(true),
                )
                .arg(
                    Arg::new("record-url")
                        .long("record-url")
                        .value_name("URL")
                        .help("Endpoint of the session record store.")
                        .required(true),
                )
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .value_name("USER ID")
                        .help("User identity for artifact scoping.")
                        .default_value("local"),
                )
                .arg(
                    Arg::new("device")
                        .short('d')
                        .long("device")
                        .value_name("DEVICE")
                        .help("Capture device: mic (real microphone) or synthetic.")
                        .default_value("synthetic"),
                )
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_name("SECONDS")
                        .help("End the session automatically after this many seconds.")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("analyze")
                .about("Extract poses from a stored recording and print the angle report.")
                .arg(sport_arg())
                .arg(
                    Arg::new("video")
                        .long("video")
                        .value_name("PATH")
                        .help("Stored recording path as known to the extraction service.")
                        .required(true),
                )
                .arg(
                    Arg::new("extractor-url")
                        .long("extractor-url")
                        .value_name("URL")
                        .help("Endpoint of the pose extraction service.")
                        .required(true),
                )
                .arg(
                    Arg::new("mime")
                        .long("mime")
                        .value_name("MIME")
                        .default_value("video/mp4"),
                )
                .arg(
                    Arg::new("at")
                        .long("at")
                        .value_name("SECONDS")
                        .help("Also render the overlay for the pose frame nearest this playback time.")
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
}

fn parse_sport(matches: &ArgMatches) -> Sport {
    matches
        .get_one::<String>("sport")
        .and_then(|raw| Sport::parse(raw))
        .unwrap_or(Sport::General)
}

async fn run_session(matches: &ArgMatches) -> anyhow::Result<()> {
    let context = SportContext {
        sport: parse_sport(matches),
        skill: matches.get_one::<String>("skill").cloned().unwrap_or_default(),
        analysis_type: matches.get_one::<String>("analysis").cloned().unwrap_or_default(),
    };

    let device: Arc<dyn CaptureDevice> =
        match matches.get_one::<String>("device").map(String::as_str) {
            Some("mic") => Arc::new(MicrophoneDevice::default()),
            _ => Arc::new(SyntheticDevice::default()),
        };
    let coach_url = matches.get_one::<String>("coach-url").cloned().unwrap_or_default();
    let artifact_url = matches.get_one::<String>("artifact-url").cloned().unwrap_or_default();
    let record_url = matches.get_one::<String>("record-url").cloned().unwrap_or_default();
    let user = matches.get_one::<String>("user").cloned().unwrap_or_default();

    let mut orchestrator = SessionOrchestrator::new(
        device,
        Arc::new(WsCoachConnector::new(coach_url)),
        Arc::new(HttpArtifactStore::new(artifact_url)),
        Arc::new(HttpSessionStore::new(record_url)),
        user,
        default_recording_dir(),
    );

    // Ctrl-C requests a graceful end instead of killing the process.
    let stop = CancellationToken::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.cancel())?;

    orchestrator.start(context).await?;
    println!("session started, press Ctrl-C to end");

    let deadline = matches
        .get_one::<u64>("duration")
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or(Duration::from_secs(60 * 60 * 24));
    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);

    let mut elapsed = orchestrator
        .elapsed_watch()
        .ok_or_else(|| anyhow::anyhow!("no active session"))?;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = &mut timeout => break,
            changed = elapsed.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("elapsed {}", format_elapsed(*elapsed.borrow()));
            }
        }
    }
    drop(elapsed);

    match orchestrator.end().await? {
        Some(record) => {
            println!("session saved as {}", record.id);
            if let Some(score) = record.overall_score {
                println!("overall score: {:.1}", score);
            }
        }
        None => println!("no session to save"),
    }
    Ok(())
}

async fn run_analyze(matches: &ArgMatches) -> anyhow::Result<()> {
    let sport = parse_sport(matches);
    let request = ExtractionRequest {
        video_path: matches.get_one::<String>("video").cloned().unwrap_or_default(),
        sport_context: sport,
        mime_type: matches.get_one::<String>("mime").cloned().unwrap_or_default(),
    };
    let extractor_url = matches
        .get_one::<String>("extractor-url")
        .cloned()
        .unwrap_or_default();

    let set = HttpPoseExtractor::new(extractor_url).extract(request).await?;
    println!(
        "{} key frames over {:.1} s ({} source frames at {} fps)",
        set.len(),
        set.duration,
        set.total_frames,
        set.fps
    );

    for frame in set.frames() {
        println!("frame {} @ {:.2}s", frame.frame_number, frame.timestamp);
        for def in catalog_for(sport) {
            match measure(frame, def) {
                Some(m) => {
                    let status = evaluate(m.degrees, def.ideal);
                    println!("  {:<24} {:>6.1}\u{b0}  {:?}", def.label, m.degrees, status);
                }
                None => println!("  {:<24} not visible", def.label),
            }
        }
        if !is_balanced(frame) {
            println!("  off balance");
        }
    }

    for wrist in [JointName::LeftWrist, JointName::RightWrist] {
        if let Some((index, speed)) = peak_velocity(set.frames(), wrist) {
            let frame = &set.frames()[index];
            println!(
                "peak {} speed {:.2} units/s at {:.2}s",
                wrist.as_str(),
                speed,
                frame.timestamp
            );
        }
    }

    if let Some(at) = matches.get_one::<f64>("at") {
        match closest_frame(set.frames(), *at) {
            Some(frame) => {
                let mut surface = RecordingSurface::new();
                let area = DisplayArea::new(FRAME_WIDTH as f32, FRAME_HEIGHT as f32);
                OverlayRenderer::new(sport, OverlayOptions::default())
                    .render(frame, area, &mut surface);
                println!(
                    "overlay at {:.2}s: frame {}, {} draw calls",
                    at,
                    frame.frame_number,
                    surface.ops.len()
                );
            }
            None => println!("no pose frame within tolerance of {:.2}s", at),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // kill the main thread as soon as a secondary thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // invoke the default handler and exit the process
        orig_hook(panic_info);
        process::exit(105);
    }));

    let matches = cli().get_matches();
    info!("{} {}", app_name(), app_version());

    match matches.subcommand() {
        Some(("session", sub)) => run_session(sub).await,
        Some(("analyze", sub)) => run_analyze(sub).await,
        _ => unreachable!("subcommand_required"),
    }
}
