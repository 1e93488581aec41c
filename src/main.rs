use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use notarium::{
    chat::{ChatSession, LoopbackTransport, SendOutcome, SessionStatus, CHANNELS},
    config::{Config, ConfigStore, FileConfigStore},
    notes::{NewNote, Note, NoteQuery, NoteSort, NotesDb, ALL_SUBJECTS},
    permissions::{Member, Role},
    profile::ProfileDb,
    quiz::{
        parse_day_key, reward::level_progress, reward::DEFAULT_NEXT_LEVEL_EXP, today_utc, AttemptState,
        ClockedAttempt, DailySelector, Question, QuestionPool, QuestionSelector, QuizAttempt, Turn,
    },
    runtime::{FixedTicker, InputEvent, Runner, StdinSource},
};
use std::{
    error::Error,
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 1_000;

/// daily quiz and moderated study chat for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Answer the same daily questions as everyone else, keep a local profile of points and badges, and chat with a spam and profanity filter in front of every message."
)]
pub struct Cli {
    /// config file to use instead of the per-user default
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// profile database to use instead of the per-user default
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// print the questions selected for a day
    Daily {
        /// day to select for, defaults to today (UTC)
        #[clap(short = 'd', long)]
        date: Option<String>,

        /// number of questions to select
        #[clap(short = 'n', long)]
        count: Option<usize>,

        /// question pool JSON file
        #[clap(short = 'p', long)]
        pool: Option<PathBuf>,

        /// print the selection as JSON
        #[clap(long)]
        json: bool,
    },
    /// answer the day's questions against the clock
    Play {
        #[clap(short = 'd', long)]
        date: Option<String>,

        #[clap(short = 'u', long)]
        user: Option<String>,
    },
    /// chat in a local room with the admission filter active
    Chat {
        #[clap(short = 'c', long)]
        channel: Option<String>,

        #[clap(short = 'u', long)]
        user: Option<String>,

        #[clap(long)]
        name: Option<String>,

        #[clap(long, value_enum)]
        role: Option<Role>,
    },
    /// show points, badges and recent activity
    Profile {
        #[clap(short = 'u', long)]
        user: Option<String>,
    },
    /// list past quiz results
    History {
        #[clap(short = 'u', long)]
        user: Option<String>,

        /// write the history to a CSV file instead of printing it
        #[clap(long)]
        csv: Option<PathBuf>,
    },
    /// best scores of a day
    Leaderboard {
        #[clap(short = 'd', long)]
        date: Option<String>,

        #[clap(short = 'l', long, default_value_t = 10)]
        limit: usize,
    },
    /// browse and share course notes
    Notes {
        #[clap(subcommand)]
        action: NotesAction,
    },
    /// inspect or create the config file
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum NotesAction {
    /// list notes, newest first by default
    List {
        /// match title, description or tags, ignoring case
        #[clap(short = 's', long, default_value = "")]
        search: String,

        /// subject id, `all` for every subject
        #[clap(long, default_value = ALL_SUBJECTS)]
        subject: String,

        #[clap(long, value_enum, default_value_t = NoteSort::Newest)]
        sort: NoteSort,

        #[clap(long)]
        json: bool,
    },
    /// share a note (admins only)
    Add {
        #[clap(long)]
        title: String,

        #[clap(long)]
        subject: String,

        #[clap(long)]
        description: String,

        /// comma separated
        #[clap(long, default_value = "")]
        tags: String,

        #[clap(long, default_value = "")]
        link: String,
    },
    /// delete a note (admins only)
    Delete { id: i64 },
    /// like a note, or take the like back
    Like { id: i64 },
    /// print the link of a note and count the download
    Download { id: i64 },
    /// show a note in full
    Show { id: i64 },
    /// list subjects
    Subjects,
    /// add a subject (admins only)
    AddSubject { name: String },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ConfigAction {
    /// print the effective configuration
    Show,
    /// write the effective configuration to the config file
    Init,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = store.load();

    match cli.command.clone() {
        Command::Daily {
            date,
            count,
            pool,
            json,
        } => {
            let day = resolve_day(date.as_deref())?;
            let pool = match pool {
                Some(path) => QuestionPool::from_path(path)?,
                None => config.question_pool()?,
            };
            let questions = DailySelector::new(day).select_questions(&pool, count.unwrap_or(config.question_count));
            if json {
                println!("{}", serde_json::to_string_pretty(&questions)?);
            } else {
                println!("{} ({} of {})", day, questions.len(), pool.len());
                for (n, question) in questions.iter().enumerate() {
                    println!("{}. [#{}] {}", n + 1, question.id, question.prompt);
                    println!("   {}", option_line(question));
                }
            }
        }
        Command::Play { date, user } => {
            let day = resolve_day(date.as_deref())?;
            let mut db = open_db(cli.db.as_deref())?;
            play(&config, &mut db, day, user)?;
        }
        Command::Chat {
            channel,
            user,
            name,
            role,
        } => {
            let mut member = config.member();
            if let Some(user) = user {
                member.id = user;
            }
            if let Some(name) = name {
                member.name = name;
            }
            if let Some(role) = role {
                member.role = role;
            }
            chat(&config, member, channel.as_deref())?;
        }
        Command::Profile { user } => {
            let db = open_db(cli.db.as_deref())?;
            let user_id = user.unwrap_or_else(|| config.user_id.clone());
            let Some(profile) = db.load(&user_id)? else {
                println!("no profile for {user_id} yet; play a quiz first");
                return Ok(());
            };
            println!("{} ({}, {})", profile.name, profile.user_id, profile.role);
            println!("points: {}", profile.total_points);
            println!(
                "experience: {} ({:.0}% to next level)",
                profile.experience,
                level_progress(profile.experience, DEFAULT_NEXT_LEVEL_EXP)
            );
            println!("quiz wins: {}", profile.quiz_wins);
            println!(
                "last solved: {}",
                profile.quiz_last_solved.as_deref().unwrap_or("never")
            );
            if !profile.badges.is_empty() {
                println!(
                    "badges: {}",
                    profile
                        .badges
                        .iter()
                        .map(|b| format!("{} {} ({})", b.icon, b.name, b.earned))
                        .join(", ")
                );
            }
            for activity in &profile.recent_activity {
                println!("  [{}] {} {}", activity.date, activity.kind, activity.title);
            }
        }
        Command::History { user, csv } => {
            let db = open_db(cli.db.as_deref())?;
            let user_id = user.unwrap_or_else(|| config.user_id.clone());
            match csv {
                Some(path) => {
                    let written = db.export_history_csv(&user_id, File::create(&path)?)?;
                    println!("wrote {written} records to {}", path.display());
                }
                None => {
                    let records = db.history(&user_id)?;
                    if records.is_empty() {
                        println!("no results for {user_id}");
                    }
                    for record in records {
                        println!("{}  {}/{}", record.day, record.score, record.total);
                    }
                }
            }
        }
        Command::Leaderboard { date, limit } => {
            let day = resolve_day(date.as_deref())?;
            let db = open_db(cli.db.as_deref())?;
            let entries = db.leaderboard(day, limit)?;
            println!("leaderboard for {day}");
            for (rank, entry) in entries.iter().enumerate() {
                println!("{:>3}. {:<20} {}/{}", rank + 1, entry.name, entry.score, entry.total);
            }
        }
        Command::Notes { action } => {
            let mut db = open_notes(cli.db.as_deref())?;
            notes(&mut db, &config.member(), action)?;
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", store.path().display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Init => {
                store.save(&config)?;
                println!("wrote {}", store.path().display());
            }
        },
    }

    Ok(())
}

fn resolve_day(date: Option<&str>) -> notarium::Result<NaiveDate> {
    date.map_or_else(|| Ok(today_utc()), parse_day_key)
}

fn open_db(path: Option<&Path>) -> notarium::Result<ProfileDb> {
    match path {
        Some(path) => ProfileDb::open(path),
        None => ProfileDb::open_default(),
    }
}

fn open_notes(path: Option<&Path>) -> notarium::Result<NotesDb> {
    match path {
        Some(path) => NotesDb::open(path),
        None => NotesDb::open_default(),
    }
}

fn note_line(note: &Note) -> String {
    format!(
        "[{}] {} ({}, {} {}) {} downloads, {} likes",
        note.id, note.title, note.subject, note.author, note.date, note.downloads, note.likes
    )
}

fn notes(db: &mut NotesDb, member: &Member, action: NotesAction) -> Result<(), Box<dyn Error>> {
    match action {
        NotesAction::List {
            search,
            subject,
            sort,
            json,
        } => {
            let found = db.list(&NoteQuery { search, subject, sort })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if found.is_empty() {
                println!("no notes found");
            } else {
                for note in &found {
                    println!("{}", note_line(note));
                }
            }
        }
        NotesAction::Add {
            title,
            subject,
            description,
            tags,
            link,
        } => {
            let new = NewNote {
                title,
                subject,
                description,
                tags,
                drive_link: link,
            };
            let note = db.add_note(member, new, today_utc())?;
            println!("shared {}", note_line(&note));
        }
        NotesAction::Delete { id } => {
            db.delete_note(member, id)?;
            println!("deleted note {id}");
        }
        NotesAction::Like { id } => {
            let (liked, likes) = db.toggle_like(&member.id, id)?;
            let verb = if liked { "liked" } else { "unliked" };
            println!("{verb} note {id} ({likes} likes)");
        }
        NotesAction::Download { id } => {
            let note = db.download(id)?;
            if note.drive_link.is_empty() {
                println!("note {id} has no link");
            } else {
                println!("{}", note.drive_link);
            }
        }
        NotesAction::Show { id } => {
            let note = db.view(id)?;
            println!("{}", note.title);
            println!("{} | {} | {}", note.subject, note.author, note.date);
            println!("{}", note.description);
            if !note.tags.is_empty() {
                println!("tags: {}", note.tags.iter().map(|t| format!("#{t}")).join(" "));
            }
            println!(
                "{} views, {} downloads, {} likes",
                note.views, note.downloads, note.likes
            );
        }
        NotesAction::Subjects => {
            for subject in db.subjects()? {
                println!("{:<24} {}", subject.id, subject.name);
            }
        }
        NotesAction::AddSubject { name } => {
            let subject = db.add_subject(member, &name)?;
            println!("added subject {} ({})", subject.name, subject.id);
        }
    }
    Ok(())
}

fn option_line(question: &Question) -> String {
    question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}) {option}", i + 1))
        .join("   ")
}

fn print_question(attempt: &QuizAttempt) {
    if let Some(question) = attempt.current_question() {
        let answered = attempt.answers().len();
        println!();
        println!("[{}/{}] {}", answered + 1, attempt.total(), question.prompt);
        println!("   {}", option_line(question));
        println!("   {}s per question, answer with a number", attempt.time_left_secs());
    }
}

fn play(config: &Config, db: &mut ProfileDb, day: NaiveDate, user: Option<String>) -> Result<(), Box<dyn Error>> {
    let pool = config.question_pool()?;
    let questions = DailySelector::new(day).select_questions(&pool, config.question_count);
    let user_id = user.unwrap_or_else(|| config.user_id.clone());
    let mut profile = db.load_or_create(&user_id, &config.user_name)?;

    let mut attempt = QuizAttempt::with_time_limit(day, questions, config.question_secs);
    if attempt.start(profile.last_solved_day()) == AttemptState::AlreadySolvedToday {
        println!("You already solved the questions for {day}. Come back tomorrow.");
        return Ok(());
    }
    print_question(&attempt);

    let runner = Runner::new(StdinSource::new(), FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));
    let mut clocked = ClockedAttempt::new(attempt, Instant::now());
    while !clocked.attempt().is_finished() {
        match clocked.handle(runner.step(), Instant::now()) {
            Turn::Waiting => continue,
            Turn::Unreadable(_) => {
                eprintln!("enter the number of an option");
                continue;
            }
            Turn::Refused(e) => {
                eprintln!("{e}");
                continue;
            }
            Turn::Abandoned => {
                println!("Quiz abandoned; nothing was recorded.");
                return Ok(());
            }
            Turn::Answered { question, record } => {
                if record.correct {
                    println!("Correct!");
                } else {
                    println!("Wrong. The answer was {}.", question.correct_text().unwrap_or("?"));
                }
            }
            Turn::TimedOut {
                question,
                late_input,
                ..
            } => {
                if late_input {
                    eprintln!("too late for that one");
                }
                println!("Time's up! The answer was {}.", question.correct_text().unwrap_or("?"));
            }
        }
        print_question(clocked.attempt());
    }
    let attempt = clocked.into_attempt();

    let score = attempt.final_score().unwrap_or(0);
    println!();
    println!("Score: {score}/{}", attempt.total());
    if let Some(reward) = db.record_quiz(&mut profile, day, score, attempt.total())? {
        println!("+{} points, +{} XP", reward.points, reward.experience);
        if let Some(badge) = reward.badge {
            println!("{} {} unlocked!", badge.icon, badge.name);
        }
    }
    Ok(())
}

fn chat(config: &Config, member: Member, channel: Option<&str>) -> Result<(), Box<dyn Error>> {
    let (transport, _handle) = LoopbackTransport::pair();
    let mut session = ChatSession::connect(member, transport, config.admission_filter()?)?;
    if let Some(channel) = channel {
        session.switch_channel(channel)?;
    }
    session.drain();
    println!(
        "#{} as {} ({}); /join <channel>, /channels, /online, /ban <id>, /kick <id>, /grant <id>, /revoke <id>, /quit",
        session.channel().id,
        session.member().name,
        session.member().role
    );

    let runner = Runner::new(StdinSource::new(), FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));
    let mut shown = 0;
    let mut reported_error = None;
    loop {
        match runner.step() {
            InputEvent::Tick => {
                session.tick(Utc::now().timestamp_millis());
            }
            InputEvent::Eof => break,
            InputEvent::Line(line) => {
                let line = line.trim();
                let mut words = line.splitn(2, ' ');
                let result = match (words.next(), words.next()) {
                    (Some("/quit"), _) => break,
                    (Some("/channels"), _) => {
                        for channel in &CHANNELS {
                            println!("  {} #{} {}", channel.icon, channel.id, channel.name);
                        }
                        Ok(())
                    }
                    (Some("/online"), _) => {
                        println!(
                            "  {}",
                            session
                                .online_users()
                                .iter()
                                .map(|m| format!("{} {} ({})", m.avatar, m.name, m.id))
                                .join(", ")
                        );
                        Ok(())
                    }
                    (Some("/join"), Some(id)) => session.switch_channel(id.trim()).map(|_| shown = 0),
                    (Some("/ban"), Some(id)) => session.ban(id.trim()),
                    (Some("/kick"), Some(id)) => session.kick(id.trim()),
                    (Some("/grant"), Some(id)) => session.grant_admin(id.trim()),
                    (Some("/revoke"), Some(id)) => session.revoke_admin(id.trim()),
                    _ => match session.send(line, Utc::now().timestamp_millis())? {
                        SendOutcome::Rejected {
                            reason,
                            remaining_secs,
                        } => {
                            println!("! {reason} ({remaining_secs}s)");
                            Ok(())
                        }
                        SendOutcome::NotPermitted(capability) => {
                            println!("! #{} needs {capability}", session.channel().id);
                            Ok(())
                        }
                        SendOutcome::Sent(_) | SendOutcome::Ignored => Ok(()),
                    },
                };
                if let Err(e) = result {
                    println!("! {e}");
                }
            }
        }

        session.drain();
        for message in &session.messages()[shown.min(session.messages().len())..] {
            println!("[{}] {} {}: {}", message.timestamp, message.avatar, message.user, message.message);
        }
        shown = session.messages().len();
        if session.last_error() != reported_error.as_deref() {
            reported_error = session.last_error().map(str::to_string);
            if let Some(error) = &reported_error {
                println!("! {error}");
            }
        }
        if session.status() != SessionStatus::Active {
            println!("session ended: {:?}", session.status());
            break;
        }
    }

    session.logout();
    Ok(())
}
