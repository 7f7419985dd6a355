//! Demo that pushes a few sample events through the display sinks
//! (console only unless webhook env vars are set).

use chrono::Utc;
use feed_slurper::{Event, EventKind, Notifier, NotifierMux};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let mux = NotifierMux::from_env();

    let samples = [
        Event {
            source: "Frack".into(),
            link: "https://twitter.com/fracknl/status/1024".into(),
            occurred_at: Utc::now(),
            text: "Soldering & pizza tonight, doors open at 20:00".into(),
            author: Some("fracknl".into()),
            title: None,
            kind: EventKind::Post,
        },
        Event {
            source: "TkkrLab".into(),
            link: "http://tkkrlab.nl/wiki/index.php?title=Laser_cutter&diff=512&oldid=511".into(),
            occurred_at: Utc::now(),
            text: "fixed the power settings table".into(),
            author: Some("Renze".into()),
            title: Some("Laser cutter".into()),
            kind: EventKind::Edit {
                article: "http://tkkrlab.nl/wiki/Laser_cutter".into(),
            },
        },
    ];

    for ev in &samples {
        if let Err(e) = mux.send(ev).await {
            tracing::warn!(error = %format!("{e:#}"), "demo delivery failed");
        }
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    println!("notify-demo done");
}
