//! Application state and core logic

use crate::backend::{BackendClient, BackendClientTrait, CreateAnnouncement};
use crate::config::PortalConfig;
use crate::export::{export_class_to_file, ExportError, ExportOptions, ExportProgress, ExportSummary};
use crate::files::{self, storage_path};
use crate::retry::{RetryController, RetryError, UploadController, UploadState, DEFAULT_MESSAGE};
use crate::state::{
    Announcement, AnnouncementForm, AppState, AsyncCheck, DashboardStats, ExportStatus, Form,
    NewAnnouncement, SchoolClass, Student, StudentRecords, SubmitOutcome, Teacher,
    TitleAvailability, View, ViewParams, ANNOUNCEMENT_FIELDS,
};
use crate::ui::Theme;
use anyhow::{anyhow, Result};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Storage bucket for announcement attachments
pub const ATTACHMENT_BUCKET: &str = "lampiran";

/// Folder inside [`ATTACHMENT_BUCKET`] for announcement files
const ATTACHMENT_FOLDER: &str = "pengumuman";

/// Data delivered by a finished background load
#[derive(Debug, Clone)]
pub enum Loaded {
    Dashboard {
        stats: DashboardStats,
        announcements: Vec<Announcement>,
    },
    Classes(Vec<SchoolClass>),
    /// Students of `class_id`, or of every class
    Students {
        class_id: Option<String>,
        students: Vec<Student>,
    },
    Teachers(Vec<Teacher>),
    Announcements(Vec<Announcement>),
    StudentRecords {
        student_id: String,
        records: StudentRecords,
    },
}

type LoadFuture = Pin<Box<dyn Future<Output = Result<Loaded>> + Send>>;
type LoadOperation = Box<dyn FnMut() -> LoadFuture + Send>;

/// A background load and the controller that retries it
pub struct LoadJob {
    what: &'static str,
    controller: RetryController<Loaded, LoadOperation>,
}

impl fmt::Debug for LoadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadJob")
            .field("what", &self.what)
            .finish_non_exhaustive()
    }
}

/// Results of background work, applied on the UI task
#[derive(Debug)]
pub enum AppEvent {
    Loaded(Loaded),
    /// The job comes back so the user can run it again
    LoadFailed {
        message: String,
        /// The backend could not be reached at all
        disconnected: bool,
        job: Box<LoadJob>,
    },
    Retrying {
        what: &'static str,
        attempt: u32,
    },
    /// The form comes back from the submit task with its final state
    AnnouncementSubmitted {
        form: Box<AnnouncementForm>,
        outcome: SubmitOutcome,
    },
    ExportProgress(ExportProgress),
    ExportFinished(Result<ExportSummary, String>),
}

/// Main application struct
pub struct App {
    /// Current application state
    pub state: AppState,
    pub config: PortalConfig,
    pub theme: Theme,
    /// Backend client; background tasks work on clones
    backend: BackendClient,
    /// Whether the app should quit
    quit: bool,
    /// Frame counter driving spinners
    pub tick: usize,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    pending_loads: usize,
    /// Failed load behind the error on screen
    retryable_load: Option<Box<LoadJob>>,
    /// Attachment upload of the last submitted announcement
    upload: Option<watch::Receiver<UploadState>>,
    /// Stops the upload of the announcement being submitted
    upload_cancel: Option<CancellationToken>,
    submit_cancelled: bool,
    export_task: Option<JoinHandle<()>>,
}

impl App {
    /// Connect to the backend and start loading the dashboard
    pub async fn new(config: PortalConfig, theme: Theme) -> Result<Self> {
        let backend = BackendClient::new(config.backend_address.as_deref()).await?;
        let mut app = Self::with_backend(config, theme, backend).await;
        app.refresh_dashboard();
        app.load_classes();
        Ok(app)
    }

    /// Build the app around an existing client without loading anything
    pub async fn with_backend(config: PortalConfig, theme: Theme, backend: BackendClient) -> Self {
        let mut state = AppState::new(config.items_per_page());
        state.backend_connected = backend.check_connection().await;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state,
            config,
            theme,
            backend,
            quit: false,
            tick: 0,
            events_tx,
            events_rx,
            pending_loads: 0,
            retryable_load: None,
            upload: None,
            upload_cancel: None,
            submit_cancelled: false,
            export_task: None,
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        if let Some(task) = self.export_task.take() {
            task.abort();
        }
        self.quit = true;
    }

    /// Push an error message to the error queue for display
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.state.push_error(message.into());
    }

    pub fn backend_address(&self) -> &str {
        self.backend.address()
    }

    /// Latest state of the attachment upload, if one was started
    pub fn upload_state(&self) -> Option<UploadState> {
        self.upload.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Whether the error on screen comes from a load that can run again
    pub fn can_retry_load(&self) -> bool {
        self.retryable_load.is_some()
    }

    /// Advance spinners, apply finished validations and background results
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if let Some(form) = self.state.announcement_form.as_mut() {
            form.validator.poll();
        }
        self.poll_events();
    }

    /// Apply every background result received since the last call
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Loaded(loaded) => {
                self.finish_load();
                self.state.backend_connected = true;
                self.apply_loaded(loaded);
            }
            AppEvent::LoadFailed {
                message,
                disconnected,
                job,
            } => {
                self.finish_load();
                if disconnected {
                    self.state.backend_connected = false;
                }
                let message = format!("Gagal memuat {}. {message}", job.what);
                if !self.state.has_errors() {
                    self.retryable_load = Some(job);
                }
                self.push_error(message);
            }
            AppEvent::Retrying { what, attempt } => {
                self.state.status_message =
                    Some(format!("Mencoba ulang memuat {what} ({attempt})..."));
            }
            AppEvent::AnnouncementSubmitted { form, outcome } => {
                self.finish_submit(*form, outcome);
            }
            AppEvent::ExportProgress(progress) => {
                if let ExportStatus::Running { .. } = self.state.export_status {
                    self.state.export_status = ExportStatus::Running {
                        completed: progress.completed,
                        total: progress.total,
                    };
                }
            }
            AppEvent::ExportFinished(result) => {
                if !matches!(self.state.export_status, ExportStatus::Running { .. }) {
                    return;
                }
                self.export_task = None;
                self.state.export_status = match result {
                    Ok(summary) => {
                        self.state.status_message =
                            Some(format!("Rapor {} siswa tersimpan", summary.students));
                        ExportStatus::Finished {
                            path: summary.path.display().to_string(),
                            pages: summary.pages,
                        }
                    }
                    Err(message) => ExportStatus::Failed(message),
                };
            }
        }
    }

    fn apply_loaded(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Dashboard {
                stats,
                announcements,
            } => {
                self.state.stats = stats;
                self.state.announcements = announcements;
            }
            Loaded::Classes(classes) => {
                if self.state.class_filter.is_some_and(|idx| idx >= classes.len()) {
                    self.state.class_filter = None;
                }
                self.state.classes = classes;
            }
            Loaded::Students { class_id, students } => {
                // A newer filter may have been chosen while this was loading
                let current = self.state.selected_class().map(|c| c.id.as_str());
                if class_id.as_deref() == current {
                    self.state.set_students(students);
                }
            }
            Loaded::Teachers(teachers) => self.state.set_teachers(teachers),
            Loaded::Announcements(announcements) => self.state.announcements = announcements,
            Loaded::StudentRecords {
                student_id,
                records,
            } => {
                if self.state.view_params.student_id.as_deref() == Some(student_id.as_str()) {
                    self.state.student_records = Some(records);
                }
            }
        }
    }

    fn finish_load(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        self.state.is_loading = self.pending_loads > 0;
    }

    /// Run `load` in the background with the configured retry policy.
    /// `load` is called once per attempt with a fresh client handle.
    fn spawn_load<F, Fut>(&mut self, what: &'static str, mut load: F)
    where
        F: FnMut(BackendClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Loaded>> + Send + 'static,
    {
        let backend = self.backend.clone();
        let operation: LoadOperation =
            Box::new(move || -> LoadFuture { Box::pin(load(backend.clone())) });
        let retry_events = self.events_tx.clone();
        let controller = RetryController::new(operation, self.config.retry_policy()).on_retry(
            move |attempt, err| {
                tracing::warn!("Loading {what} failed, retry {attempt}: {err:#}");
                let _ = retry_events.send(AppEvent::Retrying { what, attempt });
            },
        );
        self.run_load(LoadJob { what, controller }, false);
    }

    /// Run `job` on a background task. With `retry` the job starts over
    /// from a reset state.
    fn run_load(&mut self, mut job: LoadJob, retry: bool) {
        self.pending_loads += 1;
        self.state.is_loading = true;

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let loaded = if retry {
                job.controller.retry().await
            } else {
                job.controller.execute().await
            };

            let event = match loaded {
                Some(loaded) => AppEvent::Loaded(loaded),
                None => {
                    let error = job.controller.state().error;
                    if let Some(err) = &error {
                        tracing::error!(
                            "Loading {} failed (max {} retries): {err}",
                            job.what,
                            job.controller.policy().max_retries
                        );
                    }
                    AppEvent::LoadFailed {
                        disconnected: error.as_ref().is_some_and(RetryError::is_connection_error),
                        message: error
                            .map(|e| e.user_message())
                            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
                        job: Box::new(job),
                    }
                }
            };
            let _ = events.send(event);
        });
    }

    pub fn refresh_dashboard(&mut self) {
        let limit = self.config.announcement_limit();
        self.spawn_load("dasbor", move |mut backend| async move {
            let stats = backend.get_dashboard_stats().await?;
            let announcements = backend.list_announcements(limit).await?;
            Ok(Loaded::Dashboard {
                stats,
                announcements,
            })
        });
    }

    pub fn load_classes(&mut self) {
        self.spawn_load("kelas", |mut backend| async move {
            Ok(Loaded::Classes(backend.list_classes().await?))
        });
    }

    /// Load the students of the selected class (or every class)
    pub fn load_students(&mut self) {
        let class_id = self.state.selected_class().map(|c| c.id.clone());
        self.spawn_load("siswa", move |mut backend| {
            let class_id = class_id.clone();
            async move {
                let students = backend.list_students(class_id.clone()).await?;
                Ok(Loaded::Students { class_id, students })
            }
        });
    }

    pub fn load_teachers(&mut self) {
        self.spawn_load("guru", |mut backend| async move {
            Ok(Loaded::Teachers(backend.list_teachers().await?))
        });
    }

    pub fn load_announcements(&mut self) {
        let limit = self.config.announcement_limit();
        self.spawn_load("pengumuman", move |mut backend| async move {
            Ok(Loaded::Announcements(backend.list_announcements(limit).await?))
        });
    }

    fn load_student_records(&mut self, student_id: String) {
        let semester = self.config.semester.clone();
        self.spawn_load("data siswa", move |mut backend| {
            let student_id = student_id.clone();
            let semester = semester.clone();
            async move {
                let grades = backend.list_grades(&student_id, semester).await?;
                let attendance = backend.list_attendance(&student_id).await?;
                let violations = backend.list_violations(&student_id).await?;
                Ok(Loaded::StudentRecords {
                    student_id,
                    records: StudentRecords {
                        grades,
                        attendance,
                        violations,
                    },
                })
            }
        });
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Handle error dialog dismissal first (modal)
        if self.state.has_errors() {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => {
                    self.state.dismiss_error();
                    self.retryable_load = None;
                }
                KeyCode::Char('r') => {
                    if let Some(job) = self.retryable_load.take() {
                        self.state.dismiss_error();
                        tracing::info!("Retrying load of {}", job.what);
                        self.run_load(*job, true);
                    }
                }
                _ => {}
            }
            return;
        }

        // Clear any status messages on key press
        self.state.status_message = None;

        // Number keys switch sections outside of forms
        if !self.state.current_view.is_form_view() {
            if let KeyCode::Char(c @ '1'..='6') = key.code {
                self.open_section(c as usize - '1' as usize);
                return;
            }
        }

        match self.state.current_view {
            View::Dashboard => self.handle_dashboard_key(key),
            View::Students => self.handle_students_key(key),
            View::StudentDetail => self.handle_student_detail_key(key),
            View::Teachers => self.handle_teachers_key(key),
            View::Announcements => self.handle_announcements_key(key),
            View::AnnouncementCreate => self.handle_announcement_create_key(key),
            View::Export => self.handle_export_key(key),
            View::Config => self.handle_config_key(key),
        }
    }

    /// Navigate to a new view
    pub fn navigate(&mut self, view: View, params: ViewParams) {
        self.state.view_history.push((
            self.state.current_view.clone(),
            self.state.view_params.clone(),
        ));
        self.state.current_view = view;
        self.state.view_params = params;
        self.state.selected_index = 0;
        self.state.detail_scroll = 0;
    }

    /// Go back to previous view
    pub fn go_back(&mut self) {
        // Skip form views in history to go back to the last non-form view
        while let Some((view, params)) = self.state.view_history.pop() {
            if view.is_form_view() {
                continue;
            }
            self.state.current_view = view;
            self.state.view_params = params;
            self.state.selected_index = 0;
            self.state.detail_scroll = 0;
            return;
        }
    }

    /// Open a sidebar section by index and refresh its data
    fn open_section(&mut self, index: usize) {
        let view = match index {
            0 => View::Dashboard,
            1 => View::Students,
            2 => View::Teachers,
            3 => View::Announcements,
            4 => View::Export,
            5 => View::Config,
            _ => return,
        };
        if self.state.current_view == view {
            return;
        }
        self.navigate(view.clone(), ViewParams::default());

        match view {
            View::Dashboard => self.refresh_dashboard(),
            View::Students => self.load_students(),
            View::Teachers if self.state.teachers.is_empty() => self.load_teachers(),
            View::Announcements => self.load_announcements(),
            View::Export if self.state.classes.is_empty() => self.load_classes(),
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char('r') = key.code {
            self.refresh_dashboard();
        }
    }

    fn handle_students_key(&mut self, key: KeyEvent) {
        let page_len = self.state.visible_students().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(page_len),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => {
                self.state.student_pagination.next_page();
                self.state.selected_index = 0;
            }
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => {
                self.state.student_pagination.prev_page();
                self.state.selected_index = 0;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.state.student_pagination.first_page();
                self.state.selected_index = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.state.student_pagination.last();
                self.state.selected_index = 0;
            }
            KeyCode::Char('c') => {
                self.state.cycle_class_filter();
                self.load_students();
            }
            KeyCode::Char('r') => self.load_students(),
            KeyCode::Enter => {
                if let Some(student) = self.state.selected_student() {
                    let student_id = student.id.clone();
                    self.open_student_detail(student_id);
                }
            }
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    fn open_student_detail(&mut self, student_id: String) {
        self.state.student_records = None;
        self.navigate(
            View::StudentDetail,
            ViewParams {
                student_id: Some(student_id.clone()),
            },
        );
        self.load_student_records(student_id);
    }

    fn handle_student_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_sub(1);
            }
            KeyCode::Esc | KeyCode::Backspace => self.go_back(),
            _ => {}
        }
    }

    fn handle_teachers_key(&mut self, key: KeyEvent) {
        let page_len = self.state.visible_teachers().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(page_len),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => {
                self.state.teacher_pagination.next_page();
                self.state.selected_index = 0;
            }
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => {
                self.state.teacher_pagination.prev_page();
                self.state.selected_index = 0;
            }
            KeyCode::Char('r') => self.load_teachers(),
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    fn handle_announcements_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') => self.open_announcement_form(),
            KeyCode::Char('r') => self.load_announcements(),
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    fn open_announcement_form(&mut self) {
        let title_check: Arc<dyn AsyncCheck> =
            Arc::new(TitleAvailability::new(self.backend.clone()));
        self.state.announcement_form = Some(AnnouncementForm::new(
            title_check,
            files::document_rules(),
            self.config.validation_debounce(),
        ));
        self.upload = None;
        self.navigate(View::AnnouncementCreate, ViewParams::default());
    }

    fn handle_announcement_create_key(&mut self, key: KeyEvent) {
        // Only Esc works while the form is away being submitted
        let Some(form) = self.state.announcement_form.as_mut() else {
            if key.code == KeyCode::Esc {
                self.cancel_submit();
            }
            return;
        };

        match key.code {
            KeyCode::Char('s') if crate::platform::is_submit_modifier(key.modifiers) => {
                self.submit_announcement();
            }
            KeyCode::Tab => form.focus_next(),
            KeyCode::BackTab => form.focus_prev(),
            KeyCode::Enter if form.is_submit_row_active() => self.submit_announcement(),
            KeyCode::Enter if form.is_active_field_multiline() => form.input_char('\n'),
            KeyCode::Enter => form.focus_next(),
            KeyCode::Esc => {
                self.state.announcement_form = None;
                self.upload = None;
                self.go_back();
            }
            KeyCode::Char(c) => form.input_char(c),
            KeyCode::Backspace => form.backspace(),
            _ => {}
        }
    }

    /// Hand the form to a background task that validates it and, when
    /// valid, uploads the attachment and creates the announcement
    fn submit_announcement(&mut self) {
        let Some(mut form) = self.state.announcement_form.take() else {
            return;
        };

        let mut uploader = UploadController::new(self.config.retry_policy());
        self.upload = Some(uploader.subscribe());
        self.upload_cancel = Some(uploader.cancellation_token());
        self.submit_cancelled = false;
        self.state.announcement_submitting = true;

        let backend = Arc::new(Mutex::new(self.backend.clone()));
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = form
                .validator
                .handle_submit(|values| async move {
                    let announcement = NewAnnouncement::from_values(&values);
                    publish_announcement(backend, &mut uploader, announcement).await?;
                    Ok(())
                })
                .await;
            let _ = events.send(AppEvent::AnnouncementSubmitted {
                form: Box::new(form),
                outcome,
            });
        });
    }

    /// Stop the attachment upload of the announcement being submitted
    fn cancel_submit(&mut self) {
        if let Some(token) = self.upload_cancel.take() {
            token.cancel();
            self.submit_cancelled = true;
            tracing::info!("Announcement upload cancelled");
            self.state.status_message = Some("Membatalkan unggahan...".to_string());
        }
    }

    fn finish_submit(&mut self, mut form: AnnouncementForm, outcome: SubmitOutcome) {
        self.state.announcement_submitting = false;
        self.upload_cancel = None;
        let cancelled = std::mem::take(&mut self.submit_cancelled);
        match outcome {
            SubmitOutcome::Submitted => {
                self.upload = None;
                self.state.status_message = Some("Pengumuman diterbitkan".to_string());
                if self.state.current_view == View::AnnouncementCreate {
                    self.go_back();
                }
                self.load_announcements();
            }
            SubmitOutcome::Invalid => {
                let first_invalid = ANNOUNCEMENT_FIELDS.iter().position(|name| {
                    form.validator
                        .field(name)
                        .is_some_and(|field| !field.is_valid)
                });
                if let Some(index) = first_invalid {
                    form.set_active_field(index);
                }
                self.state.announcement_form = Some(form);
            }
            SubmitOutcome::Failed(_) if cancelled => {
                self.state.announcement_form = Some(form);
                self.state.status_message = Some("Unggahan dibatalkan".to_string());
            }
            SubmitOutcome::Failed(message) => {
                self.state.announcement_form = Some(form);
                self.push_error(message);
            }
        }
    }

    fn handle_export_key(&mut self, key: KeyEvent) {
        let running = matches!(self.state.export_status, ExportStatus::Running { .. });
        match key.code {
            KeyCode::Char('c') if !running => {
                self.state.cycle_class_filter();
                self.state.export_status = ExportStatus::Idle;
            }
            KeyCode::Enter if !running => self.start_export(),
            KeyCode::Esc if running => self.cancel_export(),
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }

    /// Export the selected class to a PDF in the background
    fn start_export(&mut self) {
        let Some(class) = self.state.selected_class().cloned() else {
            self.push_error("Pilih kelas terlebih dahulu dengan tombol 'c'.");
            return;
        };

        let options = ExportOptions {
            school_name: self.config.school_name().to_string(),
            class_name: class.name.clone(),
            semester: self.config.semester.clone(),
            teacher_note: self.config.teacher_note.clone(),
            generated_on: Local::now().date_naive(),
        };
        let dir = self.config.export_dir();
        let mut backend = self.backend.clone();
        let events = self.events_tx.clone();

        tracing::info!("Exporting reports for class {}", class.name);
        self.state.export_status = ExportStatus::Running {
            completed: 0,
            total: 0,
        };
        self.export_task = Some(tokio::spawn(async move {
            let progress_events = events.clone();
            let result = export_class(&mut backend, &class, &options, &dir, move |progress| {
                let _ = progress_events.send(AppEvent::ExportProgress(progress));
            })
            .await;
            let result = result.map_err(|err| {
                tracing::error!("Export of class {} failed: {err}", class.name);
                err.user_message()
            });
            let _ = events.send(AppEvent::ExportFinished(result));
        }));
    }

    fn cancel_export(&mut self) {
        if let Some(task) = self.export_task.take() {
            task.abort();
            tracing::info!("Export cancelled");
        }
        self.state.export_status = ExportStatus::Idle;
        self.state.status_message = Some("Ekspor dibatalkan".to_string());
    }

    fn handle_config_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_sub(1);
            }
            KeyCode::Esc => self.go_back(),
            _ => {}
        }
    }
}

/// Fetch the roster of `class` and export it to `dir`
async fn export_class<B, P>(
    backend: &mut B,
    class: &SchoolClass,
    options: &ExportOptions,
    dir: &Path,
    on_progress: P,
) -> Result<ExportSummary, ExportError>
where
    B: BackendClientTrait + ?Sized,
    P: FnMut(ExportProgress),
{
    let students = backend
        .list_students(Some(class.id.clone()))
        .await
        .map_err(|cause| ExportError::Fetch {
            student: format!("kelas {}", class.name),
            cause,
        })?;
    export_class_to_file(backend, &students, options, dir, on_progress).await
}

/// Upload the attachment, if any, then create the announcement. Returns the
/// new announcement's id.
///
/// The upload is retried by `uploader`; creating the announcement is not
/// retried since it is not idempotent. Cancelling the uploader's token
/// also stops the announcement from being created.
async fn publish_announcement<B>(
    backend: Arc<Mutex<B>>,
    uploader: &mut UploadController,
    announcement: NewAnnouncement,
) -> Result<String>
where
    B: BackendClientTrait + 'static,
{
    let cancel = uploader.cancellation_token();
    let attachment_url = match &announcement.attachment_path {
        Some(path) => {
            let file = files::validate_path(path, &files::document_rules()).await?;
            let object_path = storage_path(ATTACHMENT_FOLDER, &file.name);
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled.into());
            }
            tracing::info!(
                "Uploading attachment {} ({})",
                file.name,
                files::format_file_size(file.size())
            );

            let uploaded = uploader
                .upload(|progress| {
                    let backend = Arc::clone(&backend);
                    let object_path = object_path.clone();
                    let content_type = file.content_type.clone();
                    let data = file.data.clone();
                    async move {
                        progress.report(10);
                        let mut backend = backend.lock().await;
                        let url = backend
                            .upload_file(ATTACHMENT_BUCKET, &object_path, &content_type, data)
                            .await?;
                        progress.report(100);
                        Ok(url)
                    }
                })
                .await;

            match uploaded {
                Some(url) => Some(url),
                None => {
                    let err = uploader
                        .state()
                        .error
                        .ok_or_else(|| anyhow!("Upload ended without a result"))?;
                    return Err(anyhow::Error::new(err).context("Failed to upload attachment"));
                }
            }
        }
        None => None,
    };

    if cancel.is_cancelled() {
        return Err(RetryError::Cancelled.into());
    }
    let id = backend
        .lock()
        .await
        .create_announcement(CreateAnnouncement {
            title: announcement.title,
            content: announcement.content,
            audience: announcement.audience.as_str().to_string(),
            pinned: announcement.pinned,
            attachment_url,
        })
        .await?;
    tracing::info!("Created announcement {id}");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendClientTrait;
    use crate::retry::{RetryPolicy, UploadStatus};
    use crate::state::{Audience, FieldValue};
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    async fn test_app() -> App {
        let config = PortalConfig {
            backend_address: Some("http://127.0.0.1:1".to_string()),
            retry_max_retries: Some(0),
            ..Default::default()
        };
        let backend = BackendClient::new(config.backend_address.as_deref())
            .await
            .unwrap();
        App::with_backend(config, Theme::default(), backend).await
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn student(id: &str, class_id: &str) -> Student {
        Student {
            id: id.to_string(),
            nis: format!("NIS-{id}"),
            name: format!("Siswa {id}"),
            class_id: class_id.to_string(),
            class_name: class_id.to_uppercase(),
            gender: "P".to_string(),
            birth_date: None,
        }
    }

    fn class(id: &str) -> SchoolClass {
        SchoolClass {
            id: id.to_string(),
            name: id.to_uppercase(),
            grade_level: 8,
            homeroom_teacher: None,
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
        }
    }

    fn announcement(attachment_path: Option<String>) -> NewAnnouncement {
        NewAnnouncement {
            title: "Libur semester".to_string(),
            content: "Libur dimulai tanggal 20 Desember.".to_string(),
            audience: Audience::Parents,
            pinned: true,
            attachment_path,
        }
    }

    #[tokio::test]
    async fn test_initial_state() {
        let app = test_app().await;
        assert!(!app.should_quit());
        assert!(!app.state.backend_connected);
        assert_eq!(app.state.current_view, View::Dashboard);
        assert!(app.upload_state().is_none());
    }

    #[tokio::test]
    async fn test_go_back_skips_form_views() {
        let mut app = test_app().await;
        app.navigate(View::Announcements, ViewParams::default());
        app.navigate(View::AnnouncementCreate, ViewParams::default());
        app.navigate(View::Config, ViewParams::default());

        app.go_back();
        assert_eq!(app.state.current_view, View::Announcements);
        app.go_back();
        assert_eq!(app.state.current_view, View::Dashboard);
        app.go_back();
        assert_eq!(app.state.current_view, View::Dashboard);
    }

    #[tokio::test]
    async fn test_number_keys_switch_sections() {
        let mut app = test_app().await;
        app.handle_key(key(KeyCode::Char('6')));
        assert_eq!(app.state.current_view, View::Config);

        app.handle_key(key(KeyCode::Char('3')));
        assert_eq!(app.state.current_view, View::Teachers);
        assert!(app.state.is_loading);
    }

    #[tokio::test]
    async fn test_error_dialog_is_modal() {
        let mut app = test_app().await;
        app.push_error("Data tidak ditemukan.");

        app.handle_key(key(KeyCode::Char('6')));
        assert_eq!(app.state.current_view, View::Dashboard);
        assert!(app.state.has_errors());

        app.handle_key(key(KeyCode::Enter));
        assert!(!app.state.has_errors());
    }

    #[tokio::test]
    async fn test_stale_student_list_is_discarded() {
        let mut app = test_app().await;
        app.state.classes = vec![class("7a"), class("7b")];
        app.state.class_filter = Some(1);

        app.handle_event(AppEvent::Loaded(Loaded::Students {
            class_id: Some("7a".to_string()),
            students: vec![student("1", "7a")],
        }));
        assert!(app.state.students.is_empty());

        app.handle_event(AppEvent::Loaded(Loaded::Students {
            class_id: Some("7b".to_string()),
            students: vec![student("2", "7b")],
        }));
        assert_eq!(app.state.students.len(), 1);
        assert!(app.state.backend_connected);
    }

    #[tokio::test]
    async fn test_student_pages_with_keys() {
        let mut app = test_app().await;
        app.navigate(View::Students, ViewParams::default());
        app.state
            .set_students((0..25).map(|i| student(&i.to_string(), "7a")).collect());

        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.state.selected_index, 1);

        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.state.student_pagination.current_page(), 2);
        assert_eq!(app.state.selected_index, 0);
        assert_eq!(app.state.selected_student().map(|s| s.id.as_str()), Some("10"));

        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(app.state.visible_students().len(), 5);
    }

    #[tokio::test]
    async fn test_records_for_other_student_are_ignored() {
        let mut app = test_app().await;
        app.state.set_students(vec![student("1", "7a")]);
        app.navigate(View::Students, ViewParams::default());
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.state.current_view, View::StudentDetail);
        assert_eq!(app.state.view_params.student_id.as_deref(), Some("1"));

        app.handle_event(AppEvent::Loaded(Loaded::StudentRecords {
            student_id: "2".to_string(),
            records: StudentRecords::default(),
        }));
        assert!(app.state.student_records.is_none());

        app.handle_event(AppEvent::Loaded(Loaded::StudentRecords {
            student_id: "1".to_string(),
            records: StudentRecords::default(),
        }));
        assert!(app.state.student_records.is_some());
    }

    /// Load of the class list that fails `failures` times before succeeding
    fn class_job(failures: usize) -> LoadJob {
        let mut calls = 0;
        let operation: LoadOperation = Box::new(move || -> LoadFuture {
            calls += 1;
            let fail = calls <= failures;
            Box::pin(async move {
                if fail {
                    Err(anyhow!("connection refused"))
                } else {
                    Ok(Loaded::Classes(vec![class("7a")]))
                }
            })
        });
        let policy = RetryPolicy {
            max_retries: 0,
            ..quick_policy()
        };
        LoadJob {
            what: "kelas",
            controller: RetryController::new(operation, policy),
        }
    }

    /// Apply background results until no load is pending
    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_events();
            if app.pending_loads == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("background load did not finish");
    }

    #[tokio::test]
    async fn test_load_failure_is_queued_as_error() {
        let mut app = test_app().await;
        app.pending_loads = 1;
        app.state.is_loading = true;
        app.state.backend_connected = true;

        app.handle_event(AppEvent::LoadFailed {
            message: "Data tidak ditemukan.".to_string(),
            disconnected: false,
            job: Box::new(class_job(0)),
        });
        assert!(!app.state.is_loading);
        assert!(app.state.backend_connected);
        assert_eq!(
            app.state.current_error(),
            Some("Gagal memuat kelas. Data tidak ditemukan.")
        );
    }

    #[tokio::test]
    async fn test_connection_failure_marks_backend_offline() {
        let mut app = test_app().await;
        app.state.backend_connected = true;

        app.run_load(class_job(1), false);
        settle(&mut app).await;

        assert!(!app.state.backend_connected);
        assert_eq!(
            app.state.current_error(),
            Some("Gagal memuat kelas. Tidak dapat terhubung ke server. Periksa koneksi internet Anda.")
        );
    }

    #[tokio::test]
    async fn test_retry_key_runs_failed_load_again() {
        let mut app = test_app().await;
        app.run_load(class_job(1), false);
        settle(&mut app).await;
        assert!(app.can_retry_load());
        assert!(app.state.classes.is_empty());

        app.handle_key(key(KeyCode::Char('r')));
        assert!(!app.state.has_errors());
        assert!(app.state.is_loading);
        settle(&mut app).await;

        assert!(!app.state.has_errors());
        assert!(!app.can_retry_load());
        assert!(app.state.backend_connected);
        assert_eq!(app.state.classes.len(), 1);
    }

    #[tokio::test]
    async fn test_dismissed_error_cannot_be_retried() {
        let mut app = test_app().await;
        app.run_load(class_job(1), false);
        settle(&mut app).await;

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.can_retry_load());
        app.push_error("Data tidak ditemukan.");
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.state.has_errors());
        assert!(!app.state.is_loading);
    }

    #[tokio::test]
    async fn test_only_first_error_offers_retry() {
        let mut app = test_app().await;
        app.push_error("Data sudah ada.");
        app.run_load(class_job(1), false);
        settle(&mut app).await;

        assert!(!app.can_retry_load());
        assert_eq!(app.state.current_error(), Some("Data sudah ada."));
    }

    #[tokio::test]
    async fn test_export_requires_a_class() {
        let mut app = test_app().await;
        app.navigate(View::Export, ViewParams::default());
        app.handle_key(key(KeyCode::Enter));

        assert!(app.state.has_errors());
        assert_eq!(app.state.export_status, ExportStatus::Idle);
    }

    #[tokio::test]
    async fn test_export_events_apply_only_while_running() {
        let mut app = test_app().await;
        app.handle_event(AppEvent::ExportProgress(ExportProgress {
            completed: 1,
            total: 2,
            student: "Budi".to_string(),
        }));
        assert_eq!(app.state.export_status, ExportStatus::Idle);

        app.state.export_status = ExportStatus::Running {
            completed: 0,
            total: 0,
        };
        app.handle_event(AppEvent::ExportProgress(ExportProgress {
            completed: 1,
            total: 2,
            student: "Budi".to_string(),
        }));
        assert_eq!(
            app.state.export_status,
            ExportStatus::Running {
                completed: 1,
                total: 2
            }
        );

        app.handle_event(AppEvent::ExportFinished(Ok(ExportSummary {
            path: "/tmp/rapor-7a.pdf".into(),
            students: 2,
            pages: 2,
        })));
        assert_eq!(
            app.state.export_status,
            ExportStatus::Finished {
                path: "/tmp/rapor-7a.pdf".to_string(),
                pages: 2
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_export_returns_to_idle() {
        let mut app = test_app().await;
        app.navigate(View::Export, ViewParams::default());
        app.state.export_status = ExportStatus::Running {
            completed: 1,
            total: 30,
        };
        app.export_task = Some(tokio::spawn(std::future::pending()));

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.state.export_status, ExportStatus::Idle);
        assert_eq!(app.state.current_view, View::Export);
        assert!(app.export_task.is_none());
    }

    #[tokio::test]
    async fn test_escape_discards_announcement_form() {
        let mut app = test_app().await;
        app.navigate(View::Announcements, ViewParams::default());
        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.state.current_view, View::AnnouncementCreate);

        app.handle_key(key(KeyCode::Char('R')));
        let form = app.state.announcement_form.as_ref().unwrap();
        assert_eq!(form.validator.value("title"), Some(&FieldValue::from("R")));

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.state.current_view, View::Announcements);
        assert!(app.state.announcement_form.is_none());
    }

    #[tokio::test]
    async fn test_invalid_submit_focuses_first_invalid_field() {
        let mut app = test_app().await;
        app.navigate(View::Announcements, ViewParams::default());
        app.open_announcement_form();
        let mut form = app.state.announcement_form.take().unwrap();
        form.set_active_field(4);
        let outcome = form.validator.handle_submit(|_| async { Ok(()) }).await;
        assert_eq!(outcome, SubmitOutcome::Invalid);

        app.state.announcement_submitting = true;
        app.handle_event(AppEvent::AnnouncementSubmitted {
            form: Box::new(form),
            outcome,
        });

        assert!(!app.state.announcement_submitting);
        let form = app.state.announcement_form.as_ref().unwrap();
        assert_eq!(form.active_field_index, 0);
        assert_eq!(app.state.current_view, View::AnnouncementCreate);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_form_and_reports() {
        let mut app = test_app().await;
        app.navigate(View::Announcements, ViewParams::default());
        app.open_announcement_form();
        let form = app.state.announcement_form.take().unwrap();

        app.handle_event(AppEvent::AnnouncementSubmitted {
            form: Box::new(form),
            outcome: SubmitOutcome::Failed("Data sudah ada.".to_string()),
        });
        assert!(app.state.announcement_form.is_some());
        assert_eq!(app.state.current_error(), Some("Data sudah ada."));
    }

    #[tokio::test]
    async fn test_successful_submit_returns_to_list() {
        let mut app = test_app().await;
        app.navigate(View::Announcements, ViewParams::default());
        app.open_announcement_form();
        let form = app.state.announcement_form.take().unwrap();

        app.handle_event(AppEvent::AnnouncementSubmitted {
            form: Box::new(form),
            outcome: SubmitOutcome::Submitted,
        });
        assert_eq!(app.state.current_view, View::Announcements);
        assert!(app.state.announcement_form.is_none());
        assert_eq!(
            app.state.status_message.as_deref(),
            Some("Pengumuman diterbitkan")
        );
    }

    #[tokio::test]
    async fn test_escape_during_submit_cancels_upload() {
        let mut app = test_app().await;
        app.navigate(View::Announcements, ViewParams::default());
        app.open_announcement_form();
        let form = app.state.announcement_form.take().unwrap();
        let token = CancellationToken::new();
        app.upload_cancel = Some(token.clone());
        app.state.announcement_submitting = true;

        app.handle_key(key(KeyCode::Esc));
        assert!(token.is_cancelled());
        assert_eq!(app.state.current_view, View::AnnouncementCreate);
        assert_eq!(
            app.state.status_message.as_deref(),
            Some("Membatalkan unggahan...")
        );

        app.handle_event(AppEvent::AnnouncementSubmitted {
            form: Box::new(form),
            outcome: SubmitOutcome::Failed("Permintaan dibatalkan.".to_string()),
        });
        assert!(!app.state.has_errors());
        assert!(app.state.announcement_form.is_some());
        assert_eq!(
            app.state.status_message.as_deref(),
            Some("Unggahan dibatalkan")
        );
    }

    #[tokio::test]
    async fn test_cancelled_publish_skips_upload_and_announcement() {
        let path = std::env::temp_dir().join(format!("portal-guru-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"%PDF-1.4 undangan").await.unwrap();

        let mut backend = MockBackendClientTrait::new();
        backend.expect_upload_file().never();
        backend.expect_create_announcement().never();

        let mut uploader = UploadController::new(quick_policy());
        uploader.cancellation_token().cancel();
        let result = publish_announcement(
            Arc::new(Mutex::new(backend)),
            &mut uploader,
            announcement(Some(path.to_string_lossy().into_owned())),
        )
        .await;
        tokio::fs::remove_file(&path).await.unwrap();

        let err = result.unwrap_err();
        assert_eq!(crate::retry::user_friendly_error(&err), "Permintaan dibatalkan.");
    }

    #[tokio::test]
    async fn test_publish_without_attachment() {
        let mut backend = MockBackendClientTrait::new();
        backend.expect_upload_file().never();
        backend
            .expect_create_announcement()
            .withf(|a| {
                a.title == "Libur semester"
                    && a.audience == "parents"
                    && a.pinned
                    && a.attachment_url.is_none()
            })
            .times(1)
            .returning(|_| Ok("ann-1".to_string()));

        let mut uploader = UploadController::new(quick_policy());
        let id = tokio_test::assert_ok!(
            publish_announcement(
                Arc::new(Mutex::new(backend)),
                &mut uploader,
                announcement(None)
            )
            .await
        );
        assert_eq!(id, "ann-1");
        assert_eq!(uploader.state().status, UploadStatus::Idle);
    }

    #[tokio::test]
    async fn test_publish_retries_attachment_upload() {
        let path = std::env::temp_dir().join(format!("portal-guru-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"%PDF-1.4 surat edaran").await.unwrap();

        let mut backend = MockBackendClientTrait::new();
        let mut calls = 0;
        backend
            .expect_upload_file()
            .withf(|bucket, object_path, content_type, _| {
                bucket == ATTACHMENT_BUCKET
                    && object_path.starts_with("pengumuman/")
                    && content_type == "application/pdf"
            })
            .times(2)
            .returning(move |_, _, _, _| {
                calls += 1;
                if calls == 1 {
                    Err(anyhow!("connection refused"))
                } else {
                    Ok("https://files.example/lampiran/surat.pdf".to_string())
                }
            });
        backend
            .expect_create_announcement()
            .withf(|a| a.attachment_url.as_deref() == Some("https://files.example/lampiran/surat.pdf"))
            .times(1)
            .returning(|_| Ok("ann-2".to_string()));

        let mut uploader = UploadController::new(quick_policy());
        let result = publish_announcement(
            Arc::new(Mutex::new(backend)),
            &mut uploader,
            announcement(Some(path.to_string_lossy().into_owned())),
        )
        .await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(result.unwrap(), "ann-2");
        let state = uploader.state();
        assert_eq!(state.status, UploadStatus::Success);
        assert_eq!(state.progress, 100);
    }

    #[tokio::test]
    async fn test_failed_upload_skips_announcement() {
        let path = std::env::temp_dir().join(format!("portal-guru-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"%PDF-1.4 jadwal").await.unwrap();

        let mut backend = MockBackendClientTrait::new();
        backend
            .expect_upload_file()
            .times(3)
            .returning(|_, _, _, _| Err(anyhow!("Payload too large")));
        backend.expect_create_announcement().never();

        let mut uploader = UploadController::new(quick_policy());
        let result = publish_announcement(
            Arc::new(Mutex::new(backend)),
            &mut uploader,
            announcement(Some(path.to_string_lossy().into_owned())),
        )
        .await;
        tokio::fs::remove_file(&path).await.unwrap();

        let err = result.unwrap_err();
        assert_eq!(
            crate::retry::user_friendly_error(&err),
            "Ukuran file melebihi batas yang diizinkan."
        );
        assert_eq!(uploader.state().status, UploadStatus::Error);
    }

    #[tokio::test]
    async fn test_export_class_fetches_roster() {
        let mut backend = MockBackendClientTrait::new();
        backend
            .expect_list_students()
            .withf(|class_id| class_id.as_deref() == Some("7a"))
            .returning(|_| Err(anyhow!("Failed to fetch")));

        let options = ExportOptions {
            school_name: "SMP Negeri 1".to_string(),
            class_name: "7A".to_string(),
            semester: None,
            teacher_note: None,
            generated_on: Local::now().date_naive(),
        };
        let err = export_class(
            &mut backend,
            &class("7a"),
            &options,
            &std::env::temp_dir(),
            |_| {},
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.user_message(),
            "Gagal mengambil data kelas 7A. Tidak dapat terhubung ke server. Periksa koneksi internet Anda."
        );
    }
}
