use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDateTime};
use log::{debug, warn};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{ApiClient, ApiError, Fetched, Freshness};
use crate::cli::args::{AuthCommands, FavoriteCommands, NotifyCommands};
use crate::config::{AppConfig, TimetableSourceKind};
use crate::db::{
    self,
    repository::{CacheRepo, MetaRepo, PrefsRepo, KEY_LANGUAGE, KEY_SETUP_DONE, KEY_THEME},
    SharedConn,
};
use crate::models::{ContactMessage, Dua, PrayerName, PrayerStatus, PrayerTimetable};
use crate::notifications::{ConsoleNotifier, NotificationScheduler, NotificationService, SyncOutcome};
use crate::prayer_times::{
    build_source, calculator::CALC_METHODS, load_timetable, location, resolve, ConfiguredLocation,
    LocationError, OfflineCalculator, PrayerTracker, TimetableSource, TrackerView,
};
use crate::utils::format::{format_duration_secs, format_time, truncate};
use crate::utils::time::remaining_seconds;

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! print_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        print!("\x1b[0m");
    }};
}

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

// ─── Shared wiring ───────────────────────────────────────────────────────────

/// Loaded config plus the open database, handed to every handler.
pub struct AppContext {
    pub config: AppConfig,
    pub conn: SharedConn,
}

impl AppContext {
    pub fn new(config: AppConfig, conn: SharedConn) -> Self {
        Self { config, conn }
    }

    fn location(&self) -> ConfiguredLocation {
        ConfiguredLocation::from_config(&self.config.salah)
    }

    fn source(&self) -> Result<Arc<dyn TimetableSource>> {
        build_source(&self.config, Arc::clone(&self.conn))
    }

    fn api(&self) -> Result<ApiClient> {
        ApiClient::from_config(&self.config.api, Arc::clone(&self.conn))
            .context("Building API client")
    }

    fn scheduler(&self) -> Result<(Arc<NotificationScheduler>, Arc<ConsoleNotifier>)> {
        let notifier = Arc::new(ConsoleNotifier::new(
            Arc::clone(&self.conn),
            &self.config.notifications,
        ));
        let scheduler = NotificationScheduler::new(
            Arc::clone(&self.conn),
            Arc::new(self.location()),
            self.source()?,
            notifier.clone(),
        );
        Ok((Arc::new(scheduler), notifier))
    }
}

// ─── Setup ───────────────────────────────────────────────────────────────────

/// Values given on the command line; anything missing is asked for.
#[derive(Debug, Default)]
pub struct SetupOptions {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub name: Option<String>,
    pub method: Option<String>,
    pub madhab: Option<String>,
    pub source: Option<String>,
    pub reset: bool,
}

impl SetupOptions {
    fn is_empty(&self) -> bool {
        self.lat.is_none()
            && self.lng.is_none()
            && self.name.is_none()
            && self.method.is_none()
            && self.madhab.is_none()
            && self.source.is_none()
    }
}

pub fn handle_setup(ctx: &mut AppContext, opts: SetupOptions) -> Result<()> {
    {
        let conn = db::lock(&ctx.conn)?;
        if !opts.reset && opts.is_empty() && MetaRepo::get(&conn, KEY_SETUP_DONE)?.as_deref() == Some("1") {
            println!("hisn is already configured. Use --reset to reconfigure.");
            return Ok(());
        }
    }

    println!();
    println_colored!(GOLD, "  hisn setup");
    println!();

    let salah = &mut ctx.config.salah;

    let lat = match opts.lat {
        Some(v) => v,
        None => prompt_parse("  Latitude (e.g. 33.6844): ")?,
    };
    let lng = match opts.lng {
        Some(v) => v,
        None => prompt_parse("  Longitude (e.g. 73.0479): ")?,
    };
    location::validate(lat, lng)?;

    let name = match opts.name {
        Some(n) => n,
        None => prompt_default("  Location name", &salah.location_name)?,
    };

    let method = match opts.method {
        Some(m) => m,
        None => {
            println_colored!(DIM, "  Methods: {}", CALC_METHODS.join(", "));
            prompt_default("  Calculation method", &salah.calc_method)?
        }
    };
    let madhab = match opts.madhab {
        Some(m) => m,
        None => prompt_default("  Madhab (Shafi/Hanafi)", &salah.madhab)?,
    };
    let source = match opts.source {
        Some(s) => parse_source(&s)?,
        None => parse_source(&prompt_default("  Source (offline/aladhan)", "offline")?)?,
    };

    let local_offset = Local::now().offset().local_minus_utc() / 60;
    let tz = if opts.lat.is_some() && opts.lng.is_some() {
        local_offset
    } else {
        let raw = prompt_default("  UTC offset", &format_tz_offset(local_offset))?;
        parse_tz_offset(&raw)?
    };

    // Rejects unknown method/madhab names before anything is saved.
    OfflineCalculator::new(&method, &madhab, tz, salah.hijri_offset)?;

    salah.latitude = Some(lat);
    salah.longitude = Some(lng);
    salah.location_name = name;
    salah.calc_method = method;
    salah.madhab = madhab;
    salah.timezone_offset = tz;
    salah.source = source;
    ctx.config.save()?;

    {
        let conn = db::lock(&ctx.conn)?;
        CacheRepo::clear_all(&conn)?;
        MetaRepo::set(&conn, KEY_SETUP_DONE, "1")?;
    }

    println!();
    println_colored!(
        GREEN,
        "  ✓ Saved: {} ({:.4}, {:.4}), {} / {}, UTC{}",
        ctx.config.salah.location_name,
        lat,
        lng,
        ctx.config.salah.calc_method,
        ctx.config.salah.madhab,
        format_tz_offset(tz)
    );
    println!();
    Ok(())
}

fn parse_source(s: &str) -> Result<TimetableSourceKind> {
    match s.trim().to_lowercase().as_str() {
        "offline" | "" => Ok(TimetableSourceKind::Offline),
        "aladhan" | "api" => Ok(TimetableSourceKind::Aladhan),
        other => bail!("Unknown source '{}'. Use: offline, aladhan", other),
    }
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub async fn handle_times(ctx: &AppContext, twelve_hour: bool) -> Result<()> {
    let now = Local::now().naive_local();
    let source = ctx.source()?;

    let (here, times) = match load_timetable(&ctx.location(), source.as_ref(), now.date()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            report_timetable_error(&e);
            return Ok(());
        }
    };

    println!();
    println_colored!(GOLD, "  Prayer Times · {} ({})", here.name, times.date);
    if !times.hijri.is_empty() {
        println_colored!(DIM, "  {}", times.hijri);
    }
    println!();

    print_timetable(&times, now, twelve_hour);

    let status = resolve(&times, now);
    println!();
    println_colored!(
        AMBER,
        "  Next: {} in {}",
        status.next.display_name(),
        status.remaining_hms()
    );
    println!();
    Ok(())
}

fn print_timetable(times: &PrayerTimetable, now: NaiveDateTime, twelve_hour: bool) {
    for (prayer, time) in times.entries() {
        let time_str = format_time(time, twelve_hour);
        if time < now.time() {
            println_colored!(DIM, "  {:<10}  {}", prayer.display_name(), time_str);
        } else {
            println_colored!(BOLD, "  {:<10}  {}", prayer.display_name(), time_str);
        }
    }
}

// ─── Watch ───────────────────────────────────────────────────────────────────

pub async fn handle_watch(ctx: &AppContext) -> Result<()> {
    let here = ctx.location();
    let source = ctx.source()?;
    let mut tracker = PrayerTracker::new();
    let mut last_attempt: Option<Instant> = None;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println_colored!(DIM, "  ctrl-c to quit");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Local::now().naive_local();
                if tracker.should_fetch(now, last_attempt.map(|at| at.elapsed())) {
                    debug!("fetching timetable for {}", now.date());
                    last_attempt = Some(Instant::now());
                    let fetched = load_timetable(&here, source.as_ref(), now.date())
                        .await
                        .map(|(_, t)| t)
                        .map_err(|e| format!("{:#}", e));
                    tracker.apply(fetched, now);
                }
                tracker.tick(now);
                render_watch(&tracker.view());
            }
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }
    }
    Ok(())
}

fn render_watch(view: &TrackerView<'_>) {
    print!("\r\x1b[2K");
    match view {
        TrackerView::NotLoaded { error: None } => print_colored!(DIM, "  Loading prayer times…"),
        TrackerView::NotLoaded { error: Some(e) } => {
            print_colored!(RED, "  Prayer times unavailable: {}", truncate(e, 60))
        }
        TrackerView::Ready(status) => print_status(status),
        TrackerView::Stale { status, error } => {
            print_status(status);
            print_colored!(DIM, "  (stale: {})", truncate(error, 40));
        }
    }
    let _ = io::stdout().flush();
}

fn print_status(status: &PrayerStatus) {
    print_colored!(
        GOLD,
        "  {} now · {} in {}",
        status.current.display_name(),
        status.next.display_name(),
        status.remaining_hms()
    );
}

// ─── Notifications ───────────────────────────────────────────────────────────

pub async fn handle_notify(ctx: &AppContext, action: &NotifyCommands) -> Result<()> {
    match action {
        NotifyCommands::Status => {
            let prefs = {
                let conn = db::lock(&ctx.conn)?;
                PrefsRepo::notification_preferences(&conn)?
            };
            let (_, notifier) = ctx.scheduler()?;
            println!();
            if prefs.enabled {
                println_colored!(GOLD, "  Notifications: on");
            } else {
                println_colored!(AMBER, "  Notifications: off");
            }
            println!();
            for prayer in PrayerName::notifiable() {
                if prefs.allows(prayer) {
                    println_colored!(GREEN, "  ✓ {}", prayer.display_name());
                } else {
                    println_colored!(DIM, "  ○ {}", prayer.display_name());
                }
            }
            println!();
            match notifier.pending()?.first() {
                Some(s) => println!("  Pending: {} at {}", s.notification.title, s.fire_at),
                None => println_colored!(DIM, "  Nothing pending"),
            }
            println!();
        }
        NotifyCommands::On | NotifyCommands::Off => {
            let enabled = matches!(action, NotifyCommands::On);
            {
                let conn = db::lock(&ctx.conn)?;
                PrefsRepo::set_notifications_enabled(&conn, enabled)?;
            }
            println_colored!(GREEN, "  ✓ Notifications turned {}", if enabled { "on" } else { "off" });
            resync(ctx).await?;
        }
        NotifyCommands::Enable { prayer } | NotifyCommands::Disable { prayer } => {
            let enabled = matches!(action, NotifyCommands::Enable { .. });
            let prayer = PrayerName::from_str(prayer)
                .map_err(|_| anyhow!("Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha", prayer))?;
            {
                let conn = db::lock(&ctx.conn)?;
                PrefsRepo::set_prayer_enabled(&conn, prayer, enabled)?;
            }
            println_colored!(
                GREEN,
                "  ✓ {} notification {}",
                prayer.display_name(),
                if enabled { "enabled" } else { "disabled" }
            );
            resync(ctx).await?;
        }
        NotifyCommands::Sync => resync(ctx).await?,
        NotifyCommands::Daemon => {
            let (scheduler, _) = ctx.scheduler()?;
            let mut service = NotificationService::new(scheduler, &ctx.config.notifications);
            service.start();
            println_colored!(DIM, "  Watching prayer times for notifications, ctrl-c to stop");
            tokio::signal::ctrl_c().await.context("Waiting for ctrl-c")?;
            service.stop().await;
        }
    }
    Ok(())
}

/// Run one scheduling pass and report what it left pending.
async fn resync(ctx: &AppContext) -> Result<()> {
    let (scheduler, _) = ctx.scheduler()?;
    match scheduler.sync().await {
        Ok(SyncOutcome::Scheduled(s)) => println_colored!(
            DIM,
            "  Next notification: {} at {} (in {})",
            s.notification.prayer.display_name(),
            s.fire_at.format("%H:%M"),
            format_duration_secs(remaining_seconds(Local::now().naive_local(), s.fire_at))
        ),
        Ok(SyncOutcome::NothingScheduled) => println_colored!(DIM, "  No prayer left to notify today"),
        Ok(SyncOutcome::Disabled) => println_colored!(DIM, "  Nothing scheduled"),
        Err(e) => report_timetable_error(&e),
    }
    Ok(())
}

fn report_timetable_error(e: &anyhow::Error) {
    if let Some(loc) = e.downcast_ref::<LocationError>() {
        println_colored!(AMBER, "  Location unavailable: {}", loc);
        println_colored!(DIM, "  Run `hisn setup` to set your coordinates.");
    } else {
        warn!("timetable unavailable: {:#}", e);
        println_colored!(RED, "  ✗ Could not load prayer times: {:#}", e);
        println_colored!(DIM, "  Check your connection and try again.");
    }
}

// ─── Dua library ─────────────────────────────────────────────────────────────

pub async fn handle_categories(ctx: &AppContext) -> Result<()> {
    let api = ctx.api()?;
    match api.categories().await {
        Ok(Fetched { data, freshness }) => {
            println!();
            println_colored!(GOLD, "  Categories");
            print_freshness(freshness);
            println!();
            for c in &data {
                match &c.description {
                    Some(d) => println!("  {:<26}  {}  {}", c.id, c.name, dim(&truncate(d, 50))),
                    None => println!("  {:<26}  {}", c.id, c.name),
                }
            }
            println!();
        }
        Err(e) => report_api_error(&e),
    }
    Ok(())
}

pub async fn handle_subcategories(ctx: &AppContext, category: Option<&str>) -> Result<()> {
    let api = ctx.api()?;
    match api.subcategories(category).await {
        Ok(Fetched { data, freshness }) => {
            println!();
            println_colored!(GOLD, "  Subcategories");
            print_freshness(freshness);
            println!();
            if data.is_empty() {
                println_colored!(DIM, "  None found");
            }
            for s in &data {
                println!("  {:<26}  {}", s.id, s.name);
            }
            println!();
        }
        Err(e) => report_api_error(&e),
    }
    Ok(())
}

pub async fn handle_duas(ctx: &AppContext, id: &str) -> Result<()> {
    let api = ctx.api()?;
    match api.duas(id).await {
        Ok(duas) if duas.is_empty() => println_colored!(DIM, "  No duas here yet"),
        Ok(duas) => {
            println!();
            for dua in &duas {
                print_dua(dua);
            }
        }
        Err(e) => report_api_error(&e),
    }
    Ok(())
}

pub async fn handle_favorites(ctx: &AppContext, action: &FavoriteCommands) -> Result<()> {
    let api = ctx.api()?;
    match action {
        FavoriteCommands::List => match api.favorites().await {
            Ok(favs) if favs.is_empty() => println_colored!(DIM, "  No favorites saved"),
            Ok(favs) => {
                println!();
                println_colored!(GOLD, "  Favorites");
                println!();
                for fav in &favs {
                    match &fav.dua {
                        Some(dua) => print_dua(dua),
                        None => println!("  {}", fav.dua_id),
                    }
                }
            }
            Err(e) => report_api_error(&e),
        },
        FavoriteCommands::Add { dua_id } => match api.add_favorite(dua_id).await {
            Ok(_) => println_colored!(GREEN, "  ✓ Saved {} to favorites", dua_id),
            Err(e) => report_api_error(&e),
        },
        FavoriteCommands::Remove { dua_id } => match api.remove_favorite(dua_id).await {
            Ok(_) => println_colored!(GREEN, "  ✓ Removed {} from favorites", dua_id),
            Err(e) => report_api_error(&e),
        },
    }
    Ok(())
}

pub async fn handle_contact(ctx: &AppContext, message: ContactMessage) -> Result<()> {
    if message.message.trim().is_empty() {
        bail!("Message is empty");
    }
    match ctx.api()?.contact(&message).await {
        Ok(ack) => println_colored!(
            GREEN,
            "  ✓ {}",
            ack.message.as_deref().unwrap_or("Message sent")
        ),
        Err(e) => report_api_error(&e),
    }
    Ok(())
}

pub async fn handle_ask(ctx: &AppContext, query: &[String]) -> Result<()> {
    let query = query.join(" ");
    if query.trim().is_empty() {
        bail!("Describe what you need a dua for, e.g. `hisn ask before an exam`");
    }
    match ctx.api()?.ask(&query).await {
        Ok(answer) => {
            println!();
            if let Some(arabic) = &answer.arabic {
                println_colored!(GOLD, "  {}", arabic);
            }
            if let Some(t) = &answer.transliteration {
                println_colored!(DIM, "  {}", t);
            }
            if let Some(t) = &answer.translation {
                println!("  {}", t);
            }
            if let Some(r) = &answer.reference {
                println_colored!(DIM, "  ({})", r);
            }
            if let Some(x) = &answer.explanation {
                println!();
                println!("  {}", x);
            }
            println!();
        }
        Err(e) => report_api_error(&e),
    }
    Ok(())
}

fn print_dua(dua: &Dua) {
    if let Some(title) = &dua.title {
        println_colored!(BOLD, "  {}", title);
    }
    if let Some(arabic) = &dua.arabic {
        println_colored!(GOLD, "  {}", arabic);
    }
    if let Some(t) = &dua.transliteration {
        println_colored!(DIM, "  {}", t);
    }
    if let Some(t) = &dua.translation {
        println!("  {}", t);
    }
    match &dua.reference {
        Some(r) => println_colored!(DIM, "  {} · {}", r, dua.id),
        None => println_colored!(DIM, "  {}", dua.id),
    }
    println!();
}

fn print_freshness(freshness: Freshness) {
    if freshness == Freshness::Cached {
        println_colored!(AMBER, "  (offline, showing saved copy)");
    }
}

fn report_api_error(e: &ApiError) {
    warn!("api call failed: {}", e);
    match e {
        ApiError::Unauthorized => {
            println_colored!(AMBER, "  Not signed in. Use `hisn auth login --email ...`.")
        }
        e if e.is_connectivity() || matches!(e, ApiError::Decode(_)) => {
            println_colored!(RED, "  ✗ {}", e);
            println_colored!(DIM, "  Check your connection and try again.");
        }
        ApiError::RateLimited => {
            println_colored!(RED, "  ✗ The server is busy. Try again in a minute.")
        }
        e => println_colored!(RED, "  ✗ {}", e),
    }
}

// ─── Auth ────────────────────────────────────────────────────────────────────

pub async fn handle_auth(ctx: &AppContext, action: &AuthCommands) -> Result<()> {
    let api = ctx.api()?;
    let result = match action {
        AuthCommands::Signup { name, email } => {
            let password = prompt_password("Password")?;
            api.signup(name, email, &password)
                .await
                .map(|_| format!("Account created, signed in as {}", email))
        }
        AuthCommands::Login { email } => {
            let password = prompt_password("Password")?;
            api.login(email, &password)
                .await
                .map(|_| format!("Signed in as {}", email))
        }
        AuthCommands::Logout => api.logout().map(|_| "Signed out".to_string()),
        AuthCommands::Whoami => api.current_user().map(|user| match user {
            Some(u) => match u.name {
                Some(name) => format!("{} <{}>", name, u.email),
                None => u.email,
            },
            None => "Not signed in".to_string(),
        }),
        AuthCommands::ForgotPassword { email } => api
            .forgot_password(email)
            .await
            .map(|ack| ack.message.unwrap_or_else(|| "Reset code sent".to_string())),
        AuthCommands::VerifyCode { email, code } => api
            .verify_reset_code(email, code)
            .await
            .map(|ack| ack.message.unwrap_or_else(|| "Code accepted".to_string())),
        AuthCommands::ResetPassword { email, code } => {
            let password = prompt_password("New password")?;
            api.reset_password(email, code, &password)
                .await
                .map(|ack| ack.message.unwrap_or_else(|| "Password updated".to_string()))
        }
    };
    match result {
        Ok(msg) => println_colored!(GREEN, "  ✓ {}", msg),
        Err(e) => report_api_error(&e),
    }
    Ok(())
}

// ─── Preferences ─────────────────────────────────────────────────────────────

pub fn handle_prefs(ctx: &AppContext, language: Option<&str>, theme: Option<&str>) -> Result<()> {
    let conn = db::lock(&ctx.conn)?;
    if let Some(lang) = language {
        MetaRepo::set(&conn, KEY_LANGUAGE, lang)?;
    }
    if let Some(theme) = theme {
        MetaRepo::set(&conn, KEY_THEME, theme)?;
    }
    let lang = MetaRepo::get(&conn, KEY_LANGUAGE)?;
    let theme = MetaRepo::get(&conn, KEY_THEME)?;
    println!("  Language:  {}", lang.as_deref().unwrap_or("en"));
    println!("  Theme:     {}", theme.as_deref().unwrap_or("system"));
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn dim(s: &str) -> String {
    format!("{}{}\x1b[0m", DIM, s)
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf)?;
    Ok(buf.trim_end_matches('\n').trim_end_matches('\r').to_string())
}

/// Read a secret without echoing it.
fn prompt_password(label: &str) -> Result<String> {
    dialoguer::Password::new()
        .with_prompt(format!("  {}", label))
        .interact()
        .context("Reading password")
}

fn prompt_default(label: &str, default: &str) -> Result<String> {
    let answer = prompt(&format!("{} [{}]: ", label, default))?;
    let answer = answer.trim();
    Ok(if answer.is_empty() { default } else { answer }.to_string())
}

fn prompt_parse<T: FromStr>(message: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = prompt(message)?;
    raw.trim()
        .parse()
        .with_context(|| format!("'{}' is not a valid number", raw.trim()))
}

/// Parse a UTC offset string into total minutes.
/// Accepts: "5:30", "+5:30", "-5:30", "5", "+5", "5.5"
fn parse_tz_offset(s: &str) -> Result<i32> {
    let s = s.trim().trim_start_matches('+');
    let negative = s.starts_with('-');
    let s = s.trim_start_matches('-');
    let sign = if negative { -1 } else { 1 };

    let minutes = if s.contains(':') {
        let mut parts = s.splitn(2, ':');
        let hours: i32 = parts.next().unwrap_or("0").parse()?;
        let mins: i32 = parts.next().unwrap_or("0").parse()?;
        hours * 60 + mins
    } else if s.contains('.') {
        let hours: f64 = s.parse()?;
        (hours * 60.0).round() as i32
    } else {
        let hours: i32 = s.parse()?;
        hours * 60
    };

    Ok(sign * minutes)
}

/// Format total minutes as "+H:MM" string
fn format_tz_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { "-" } else { "+" };
    let abs = minutes.abs();
    let h = abs / 60;
    let m = abs % 60;
    if m == 0 {
        format!("{}{}", sign, h)
    } else {
        format!("{}{}:{:02}", sign, h, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tz_offsets_round_trip() {
        assert_eq!(parse_tz_offset("+5:30").unwrap(), 330);
        assert_eq!(parse_tz_offset("-3").unwrap(), -180);
        assert_eq!(parse_tz_offset("5.75").unwrap(), 345);
        assert_eq!(format_tz_offset(330), "+5:30");
        assert_eq!(format_tz_offset(-180), "-3");
    }

    #[test]
    fn source_names() {
        assert_eq!(parse_source("Aladhan").unwrap(), TimetableSourceKind::Aladhan);
        assert_eq!(parse_source("").unwrap(), TimetableSourceKind::Offline);
        assert!(parse_source("moon").is_err());
    }
}
