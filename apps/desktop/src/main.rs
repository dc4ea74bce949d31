mod camera;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    admin::MaintenanceOutcome,
    config::DEFAULT_SETTINGS_FILE,
    device::MissingCameraDevice,
    enrollment::EnrollmentForm,
    records::RecordFilter,
    AppCommand, AppEvent, AttendanceApp, CameraDevice, ConfirmationPrompt, MaintenanceOp,
    NoticeLevel,
};
use shared::{
    domain::{AttendanceOutcome, PageId, SubjectId},
    protocol::TRAINING_QUOTA,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::{error::TryRecvError, Receiver},
};
use tracing::info;

use crate::camera::FileCamera;

#[derive(Parser, Debug)]
#[command(about = "Attendance workflow client")]
struct Cli {
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long, global = true, default_value = "info")]
    log_filter: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Stats,
    Students,
    Records {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    Enroll {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        class: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    Mark {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        outcome: AttendanceOutcome,
        #[arg(long)]
        photo: PathBuf,
    },
    Train {
        #[arg(long)]
        student_id: String,
        /// May be repeated; frames cycle through the given photos.
        #[arg(long = "photo", required = true)]
        photos: Vec<PathBuf>,
    },
    Admin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(value_enum)]
        action: MaintenanceAction,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MaintenanceAction {
    Reset,
    DeleteFaces,
    DeleteAttendance,
}

impl From<MaintenanceAction> for MaintenanceOp {
    fn from(action: MaintenanceAction) -> Self {
        match action {
            MaintenanceAction::Reset => MaintenanceOp::ResetDatabase,
            MaintenanceAction::DeleteFaces => MaintenanceOp::DeleteFaces,
            MaintenanceAction::DeleteAttendance => MaintenanceOp::DeleteAttendance,
        }
    }
}

/// Asks on the terminal unless `--yes` was given.
struct TerminalPrompt {
    assume_yes: bool,
}

#[async_trait]
impl ConfirmationPrompt for TerminalPrompt {
    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let mut stdout = tokio::io::stdout();
        if stdout
            .write_all(format!("{message} [y/N] ").as_bytes())
            .await
            .is_err()
        {
            return false;
        }
        let _ = stdout.flush().await;

        let mut answer = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut answer).await {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn print_notices(events: &mut Receiver<AppEvent>) {
    loop {
        match events.try_recv() {
            Ok(AppEvent::Notice(notice)) => {
                let tag = match notice.level {
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Info => "info",
                    NoticeLevel::Warning => "warn",
                    NoticeLevel::Error => "error",
                };
                println!("[{tag}] {}", notice.message);
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return,
        }
    }
}

async fn run(
    app: &mut AttendanceApp,
    events: &mut Receiver<AppEvent>,
    command: AppCommand,
) -> Result<()> {
    let failure = app.dispatch(command).await;
    print_notices(events);
    match failure {
        Some(notice) => bail!(notice.message),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter.as_str())
        .init();

    let mut settings = client_core::load_settings(&cli.config);
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    settings.validate().context("invalid client settings")?;
    info!(server_url = %settings.server_url, "attendance client starting");

    let (camera, assume_yes): (Arc<dyn CameraDevice>, bool) = match &cli.command {
        Command::Mark { photo, .. } => (Arc::new(FileCamera::new(vec![photo.clone()])), false),
        Command::Enroll {
            photo: Some(photo), ..
        } => (Arc::new(FileCamera::new(vec![photo.clone()])), false),
        Command::Train { photos, .. } => (Arc::new(FileCamera::new(photos.clone())), false),
        Command::Admin { yes, .. } => (Arc::new(MissingCameraDevice), *yes),
        _ => (Arc::new(MissingCameraDevice), false),
    };
    let prompt = Arc::new(TerminalPrompt { assume_yes });
    let mut app =
        AttendanceApp::connect(settings, camera, prompt).context("failed to build HTTP client")?;
    let mut events = app.subscribe_events();

    match cli.command {
        Command::Stats => {
            let data = app.refresh().await.context("failed to load data from server")?;
            println!("{}", serde_json::to_string_pretty(&data.stats)?);
        }
        Command::Students => {
            let data = app.refresh().await.context("failed to load data from server")?;
            println!("{}", serde_json::to_string_pretty(&data.students)?);
        }
        Command::Records {
            search,
            status,
            class,
            date,
            export,
        } => {
            app.set_records_date(date);
            app.refresh().await.context("failed to load data from server")?;
            app.set_record_filter(RecordFilter {
                search: search.unwrap_or_default(),
                class_name: class.unwrap_or_default(),
                status: status.unwrap_or_default(),
            });
            run(&mut app, &mut events, AppCommand::Navigate(PageId::Check)).await?;

            let view = app.records_view();
            for line in &view.lines {
                println!(
                    "{:<24} {:<12} {:<10} {:<5} {}",
                    line.name, line.id, line.date, line.time, line.status
                );
            }
            println!(
                "today: present={} late={} absent={}",
                view.summary.present, view.summary.late, view.summary.absent
            );
            if let Some(path) = export {
                tokio::fs::write(&path, app.export_records())
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("exported {} records to {}", view.lines.len(), path.display());
            }
        }
        Command::Enroll {
            id,
            name,
            class,
            email,
            photo,
        } => {
            run(&mut app, &mut events, AppCommand::Navigate(PageId::Register)).await?;
            if photo.is_some() {
                run(&mut app, &mut events, AppCommand::OpenEnrollmentCamera).await?;
                run(&mut app, &mut events, AppCommand::CaptureEnrollmentPhoto).await?;
            }
            let form = EnrollmentForm {
                id,
                name,
                class_name: class,
                email,
            };
            run(&mut app, &mut events, AppCommand::SubmitEnrollment(form)).await?;
        }
        Command::Mark {
            subject,
            outcome,
            photo: _,
        } => {
            let steps = [
                AppCommand::Navigate(PageId::Mark),
                AppCommand::SelectSubject(Some(SubjectId::new(subject))),
                AppCommand::SelectOutcome(Some(outcome)),
                AppCommand::StartCamera,
                AppCommand::CapturePhoto,
                AppCommand::SubmitMark,
            ];
            for step in steps {
                run(&mut app, &mut events, step).await?;
            }
        }
        Command::Train { student_id, .. } => {
            run(
                &mut app,
                &mut events,
                AppCommand::StartTraining(SubjectId::new(student_id)),
            )
            .await?;
            for _ in 0..TRAINING_QUOTA {
                run(&mut app, &mut events, AppCommand::TrainingCapture).await?;
            }
        }
        Command::Admin {
            email,
            password,
            action,
            yes: _,
        } => {
            run(&mut app, &mut events, AppCommand::Navigate(PageId::Admin)).await?;
            run(
                &mut app,
                &mut events,
                AppCommand::AdminLogin { email, password },
            )
            .await?;
            let outcome = app.run_maintenance(action.into()).await;
            print_notices(&mut events);
            match outcome {
                Ok(MaintenanceOutcome::Cancelled) => println!("cancelled"),
                Ok(MaintenanceOutcome::Completed) => {}
                Err(err) => bail!(err),
            }
            app.admin_logout();
        }
    }

    Ok(())
}
