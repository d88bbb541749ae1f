// Macros
#[macro_use]
extern crate clap;
#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate anyhow;

// Std
use std::fs;
use std::sync::Arc;

// Crates
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use indexmap::IndexMap;
use prettytable::{color, Attr, Cell, Row, Table};
use reqwest::Client;

// Local
use timeclock::config::ClientSettings;
use timeclock::duration::{
    daily_minutes, format_hours_minutes, live_minutes, total_minutes, total_minutes_all, week_start,
    weekly_minutes, weekly_minutes_all,
};
use timeclock::gateway::{load_or_empty, HttpStore, SaveQueue, Store};
use timeclock::report::{csv_file_name, export_weekly_csv, history, CSV_MIME};
use timeclock::session::SessionState;
use timeclock::telemetry::{get_subscriber, init_subscriber, CLI_FILTER};
use timeclock::time_fmt::{format_date, format_local_datetime};
use timeclock::{Clock, Controller, EntryId, PunchEnd, Session, SystemClock, User, ADMIN_ID};

type Timeclock = Controller<SystemClock, SaveQueue>;

struct HourRowData {
    user: String,
    minutes: IndexMap<NaiveDate, i64>,
}

impl HourRowData {
    fn convert_to_row(&self, text_color: color::Color) -> Row {
        let mut cells: Vec<Cell> = Vec::new();
        cells.push(Cell::new(&self.user).with_style(Attr::ForegroundColor(text_color)));
        for value in self.minutes.values() {
            cells.push(
                Cell::new(&format_hours_minutes(*value)).with_style(Attr::ForegroundColor(text_color)),
            );
        }
        let total: i64 = self.minutes.values().sum();
        cells.push(Cell::new(&format_hours_minutes(total)).with_style(Attr::ForegroundColor(text_color)));
        Row::new(cells)
    }
}

fn cli() -> App<'static, 'static> {
    App::new("timeclock")
        .version(crate_version!())
        .author("Samuel Vanderwaal")
        .about("Employee timeclock: punches, users and weekly reports.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("user")
                .short("u")
                .long("user")
                .takes_value(true)
                .value_name("id")
                .help("User to log in as."),
        )
        .arg(
            Arg::with_name("passcode")
                .short("p")
                .long("passcode")
                .takes_value(true)
                .required(true)
                .help("The user's passcode, or the admin code."),
        )
        .subcommand(SubCommand::with_name("clock-in").about("Start a work session."))
        .subcommand(
            SubCommand::with_name("clock-out")
                .about("End the open work session.")
                .arg(
                    Arg::with_name("for")
                        .long("for")
                        .takes_value(true)
                        .value_name("id")
                        .help("Clock out another user (admin)."),
                ),
        )
        .subcommand(SubCommand::with_name("status").about("Show the dashboard."))
        .subcommand(
            SubCommand::with_name("history")
                .about("List punches grouped by day.")
                .arg(
                    Arg::with_name("all")
                        .short("a")
                        .long("all")
                        .help("Every user's punches (admin)."),
                ),
        )
        .subcommand(SubCommand::with_name("active").about("List users currently clocked in (admin)."))
        .subcommand(SubCommand::with_name("users").about("List users (admin)."))
        .subcommand(
            SubCommand::with_name("add-user")
                .about("Add a user (admin).")
                .arg(Arg::with_name("name").required(true))
                .arg(Arg::with_name("passcode").required(true)),
        )
        .subcommand(
            SubCommand::with_name("edit-user")
                .about("Change a user's name and passcode (admin).")
                .arg(Arg::with_name("id").required(true))
                .arg(Arg::with_name("name").required(true))
                .arg(Arg::with_name("passcode").required(true)),
        )
        .subcommand(
            SubCommand::with_name("delete-user")
                .about("Delete a user and all their punches (admin).")
                .arg(Arg::with_name("id").required(true)),
        )
        .subcommand(
            SubCommand::with_name("add-punch")
                .about("Add a completed punch, times as \"MM/DD/YYYY HH:MM AM\" (admin).")
                .arg(Arg::with_name("id").required(true))
                .arg(Arg::with_name("in").required(true))
                .arg(Arg::with_name("out").required(true)),
        )
        .subcommand(
            SubCommand::with_name("edit-punch")
                .about("Correct a punch (admin).")
                .arg(Arg::with_name("id").required(true))
                .arg(Arg::with_name("entry").required(true))
                .arg(Arg::with_name("in").required(true))
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .help("New clock-out time; the duration is recomputed."),
                )
                .arg(
                    Arg::with_name("duration")
                        .long("duration")
                        .takes_value(true)
                        .value_name("minutes")
                        .help("New duration in minutes, used when --out is not given."),
                ),
        )
        .subcommand(
            SubCommand::with_name("delete-punch")
                .about("Delete a punch (admin).")
                .arg(Arg::with_name("id").required(true))
                .arg(Arg::with_name("entry").required(true)),
        )
        .subcommand(
            SubCommand::with_name("week")
                .about("Per-day hours for the current week.")
                .arg(
                    Arg::with_name("user")
                        .long("user")
                        .takes_value(true)
                        .value_name("id")
                        .help("Only this user (admin)."),
                ),
        )
        .subcommand(
            SubCommand::with_name("export")
                .about("Export this week's punches as CSV (admin).")
                .arg(
                    Arg::with_name("user")
                        .long("user")
                        .takes_value(true)
                        .value_name("id")
                        .help("Only this user."),
                )
                .arg(
                    Arg::with_name("out")
                        .short("o")
                        .long("out")
                        .takes_value(true)
                        .value_name("file")
                        .help("Output file, '-' for stdout. Defaults to timeclock-week-<date>.csv."),
                ),
        )
        .subcommand(SubCommand::with_name("reset").about("Delete ALL punches for ALL users (admin)."))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = get_subscriber("timeclock", CLI_FILTER, std::io::stderr);
    init_subscriber(subscriber)?;

    let settings = ClientSettings::from_env()?;
    let matches = cli().get_matches();

    let store: Arc<dyn Store> = Arc::new(HttpStore::new(Client::new(), &settings.base_url));
    let snapshot = load_or_empty(store.as_ref()).await;
    let queue = SaveQueue::spawn(store);
    let mut app = Controller::new(snapshot, SystemClock, queue, &settings.admin_code);

    let outcome = match app.authenticate(matches.value_of("user"), matches.value_of("passcode").unwrap_or_default()) {
        Ok(session) => dispatch(&mut app, &session, &matches),
        Err(e) => Err(e.into()),
    };

    // Let queued saves finish before exiting.
    app.into_hook().close().await;

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(app: &mut Timeclock, session: &Session, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("clock-in", Some(_)) => {
            if app.clock_in(&session.user_id) {
                println!("Clocked in.");
            } else {
                println!("Already clocked in.");
            }
        }
        ("clock-out", Some(sub)) => {
            let target = match sub.value_of("for") {
                Some(id) => {
                    require_admin(session)?;
                    id
                }
                None => session.user_id.as_str(),
            };
            match app.clock_out(target) {
                Some(minutes) => println!("Clocked out after {}.", format_hours_minutes(minutes)),
                None => println!("Not clocked in."),
            }
        }
        ("status", Some(_)) => print_status(app, session)?,
        ("history", Some(sub)) => {
            let all = sub.is_present("all");
            if all {
                require_admin(session)?;
            }
            print_history(app, session, all);
        }
        ("active", Some(_)) => {
            require_admin(session)?;
            print_active(app);
        }
        ("users", Some(_)) => {
            require_admin(session)?;
            print_users(app);
        }
        ("add-user", Some(sub)) => {
            require_admin(session)?;
            let id = app.add_user(value(sub, "name")?, value(sub, "passcode")?)?;
            println!("User added: {}", id);
        }
        ("edit-user", Some(sub)) => {
            require_admin(session)?;
            if app.edit_user(value(sub, "id")?, value(sub, "name")?, value(sub, "passcode")?)? {
                println!("User saved.");
            }
        }
        ("delete-user", Some(sub)) => {
            require_admin(session)?;
            let id = value(sub, "id")?;
            if id == ADMIN_ID {
                bail!("The admin account cannot be deleted.");
            }
            if app.delete_user(id) {
                println!("User deleted.");
            }
        }
        ("add-punch", Some(sub)) => {
            require_admin(session)?;
            if let Some(entry) = app.add_punch(value(sub, "id")?, value(sub, "in")?, value(sub, "out")?)? {
                println!("Punch added: {}", entry);
            }
        }
        ("edit-punch", Some(sub)) => {
            require_admin(session)?;
            let entry = parse_entry_id(value(sub, "entry")?)?;
            let end = match (sub.value_of("out"), sub.value_of("duration")) {
                (Some(out), _) if !out.trim().is_empty() => PunchEnd::ClockOut(out),
                (_, Some(minutes)) => PunchEnd::Minutes(
                    minutes
                        .trim()
                        .parse::<i64>()
                        .with_context(|| format!("Duration must be a whole number of minutes: {}", minutes))?,
                ),
                _ => bail!("Give either --out or --duration."),
            };
            if app.edit_punch(value(sub, "id")?, entry, value(sub, "in")?, end)? {
                println!("Punch saved.");
            }
        }
        ("delete-punch", Some(sub)) => {
            require_admin(session)?;
            let entry = parse_entry_id(value(sub, "entry")?)?;
            if app.delete_punch(value(sub, "id")?, entry) {
                println!("Punch deleted.");
            }
        }
        ("week", Some(sub)) => {
            let filter = match sub.value_of("user") {
                Some(id) if id != session.user_id => {
                    require_admin(session)?;
                    Some(id)
                }
                Some(id) => Some(id),
                None if session.is_admin => None,
                None => Some(session.user_id.as_str()),
            };
            print_week(app, filter);
        }
        ("export", Some(sub)) => {
            require_admin(session)?;
            export_csv(app, sub.value_of("user"), sub.value_of("out"))?;
        }
        ("reset", Some(_)) => {
            require_admin(session)?;
            app.reset_all_data();
            println!("All punches deleted.");
        }
        _ => bail!("Unknown command."),
    }

    Ok(())
}

fn require_admin(session: &Session) -> Result<()> {
    if session.is_admin {
        Ok(())
    } else {
        Err(anyhow!("This command needs the admin code."))
    }
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("Missing argument: {}", name))
}

fn parse_entry_id(text: &str) -> Result<EntryId> {
    text.parse::<EntryId>()
        .with_context(|| format!("Invalid punch id: {}", text))
}

fn status_of(user: &User, app: &Timeclock) -> String {
    match user.state() {
        SessionState::ClockedIn { since } => format!(
            "In since {} ({})",
            format_local_datetime(&since),
            format_hours_minutes(live_minutes(since, app.clock().now()))
        ),
        SessionState::Idle => "Out".to_string(),
    }
}

fn print_status(app: &Timeclock, session: &Session) -> Result<()> {
    let now = app.clock().now();
    let week = week_start(now);
    let directory = app.directory();
    let user = directory
        .get(&session.user_id)
        .ok_or_else(|| anyhow!("User not found: {}", session.user_id))?;

    let mut table = Table::new();
    table.add_row(row![Fb => "Name", "Status", "This Week", "Total"]);
    table.add_row(row![
        user.name,
        status_of(user, app),
        format_hours_minutes(weekly_minutes(user, week)),
        format_hours_minutes(total_minutes(user))
    ]);
    table.printstd();

    if session.is_admin {
        let mut table = Table::new();
        table.add_row(row![Fb => "All Users", "This Week", "Total"]);
        table.add_row(row![
            directory.len(),
            format_hours_minutes(weekly_minutes_all(directory, week)),
            format_hours_minutes(total_minutes_all(directory))
        ]);
        table.printstd();
    }

    Ok(())
}

fn print_history(app: &Timeclock, session: &Session, all: bool) {
    let directory = app.directory();
    let days = if all {
        history(directory.iter())
    } else {
        history(directory.get(&session.user_id))
    };

    if days.is_empty() {
        println!("No history yet.");
        return;
    }

    let mut table = Table::new();
    table.add_row(row![Fb => "Date", "User", "Punch", "Time", "Duration", "Id"]);
    for day in days.iter() {
        for r in day.rows.iter() {
            let duration = r
                .entry
                .duration_minutes()
                .map(format_hours_minutes)
                .unwrap_or_default();
            table.add_row(row![
                day.date.format("%m/%d/%Y"),
                r.user_name,
                r.entry.label(),
                r.entry.time(),
                duration,
                r.entry.id()
            ]);
        }
        table.add_row(row![b => "", "", "", "Day total", format_hours_minutes(day.total_minutes), ""]);
    }
    table.printstd();
}

fn print_active(app: &Timeclock) {
    let active = app.directory().active_sessions(app.clock().now());
    if active.is_empty() {
        println!("No one is currently clocked in.");
        return;
    }

    let mut table = Table::new();
    table.add_row(row![Fb => "User", "Clock In", "Worked"]);
    for a in active {
        table.add_row(row![
            a.user.name,
            format_local_datetime(&a.since),
            format_hours_minutes(a.worked_minutes)
        ]);
    }
    table.printstd();
}

fn print_users(app: &Timeclock) {
    let week = week_start(app.clock().now());

    let mut table = Table::new();
    table.add_row(row![Fb => "Id", "Name", "Status", "This Week", "Total"]);
    for user in app.directory().sorted_by_name() {
        table.add_row(row![
            user.id,
            user.name,
            status_of(user, app),
            format_hours_minutes(weekly_minutes(user, week)),
            format_hours_minutes(total_minutes(user))
        ]);
    }
    table.printstd();
}

fn print_week(app: &Timeclock, filter: Option<&str>) {
    let week = week_start(app.clock().now());

    let mut table = Table::new();
    let mut header = vec![Cell::new("User").with_style(Attr::Bold)];
    for offset in 0..7 {
        let day = week.naive_local().date() + chrono::Duration::days(offset);
        let label = format!("{} {}/{}", day.weekday(), day.month(), day.day());
        header.push(Cell::new(&label).with_style(Attr::Bold));
    }
    header.push(Cell::new("Total").with_style(Attr::Bold));
    table.add_row(Row::new(header));

    let users = app
        .directory()
        .iter()
        .filter(|u| filter.map_or(true, |id| u.id == id));
    for (index, user) in users.enumerate() {
        let hour_data = HourRowData {
            user: user.name.clone(),
            minutes: daily_minutes(user, week),
        };
        let text_color = if index % 2 == 1 {
            color::MAGENTA
        } else {
            color::WHITE
        };
        table.add_row(hour_data.convert_to_row(text_color));
    }

    println!("Week of {}", format_date(&week));
    table.printstd();
}

fn export_csv(app: &Timeclock, user: Option<&str>, out: Option<&str>) -> Result<()> {
    let week = week_start(app.clock().now());
    let csv = export_weekly_csv(app.directory(), week, user)?;

    match out {
        Some("-") => println!("{}", csv),
        _ => {
            let path = out.map(String::from).unwrap_or_else(|| csv_file_name(week));
            fs::write(&path, &csv).with_context(|| format!("Failed to write {}", path))?;
            println!("Exported {} rows to {} ({}).", csv.lines().count() - 1, path, CSV_MIME);
        }
    }

    Ok(())
}
