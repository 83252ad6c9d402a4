mod modal;

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

use api_types::Id;
use engine::{
    Applied, CashFlowDraft, Collection, Console, DateRange, DictionaryDraft, DictionaryKind,
    EngineError, PAGE_SIZES, View,
};

use crate::{
    error::{AppError, Result},
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};

pub use modal::{CashFlowField, DictionaryField, Modal};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    CashFlows,
    Statuses,
    Types,
    Categories,
    Subcategories,
}

impl Section {
    pub const ALL: [Self; 5] = [
        Self::CashFlows,
        Self::Statuses,
        Self::Types,
        Self::Categories,
        Self::Subcategories,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::CashFlows => "Cash flows",
            Self::Statuses => "Statuses",
            Self::Types => "Types",
            Self::Categories => "Categories",
            Self::Subcategories => "Subcategories",
        }
    }

    pub fn kind(self) -> Option<DictionaryKind> {
        match self {
            Self::CashFlows => None,
            Self::Statuses => Some(DictionaryKind::Status),
            Self::Types => Some(DictionaryKind::Type),
            Self::Categories => Some(DictionaryKind::Category),
            Self::Subcategories => Some(DictionaryKind::Subcategory),
        }
    }

    pub fn view(self) -> View {
        match self.kind() {
            Some(kind) => View::Dictionary(kind),
            None => View::Records,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct ToastState {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct AppState {
    pub section: Section,
    pub selected: usize,
    pub modal: Option<Modal>,
    pub toast: Option<ToastState>,
    /// Where the data comes from, shown in the info bar.
    pub source: String,
}

pub struct App {
    console: Console,
    pub state: AppState,
    should_quit: bool,
}

impl App {
    pub fn new(console: Console, source: String) -> Self {
        Self {
            console,
            state: AppState {
                section: Section::CashFlows,
                selected: 0,
                modal: None,
                toast: None,
                source,
            },
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let errors = self.console.start().await;
        if let Some(err) = errors.first() {
            self.toast_error(err);
        }

        let mut terminal = ui::setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        ui::restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        let tick_rate = Duration::from_millis(200);

        while !self.should_quit {
            if self
                .state
                .toast
                .as_ref()
                .is_some_and(|toast| toast.expires_at <= Instant::now())
            {
                self.state.toast = None;
            }

            terminal
                .draw(|frame| ui::render(frame, &self.state, &self.console))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let action = map_key(key);
        if action == AppAction::Quit {
            self.should_quit = true;
            return;
        }

        match self.state.modal.take() {
            Some(modal) => self.handle_modal(modal, action).await,
            None => self.handle_list(action).await,
        }
    }

    async fn handle_list(&mut self, action: AppAction) {
        let result = match action {
            AppAction::Up => {
                self.state.selected = self.state.selected.saturating_sub(1);
                Ok(())
            }
            AppAction::Down => {
                self.select_next();
                Ok(())
            }
            AppAction::Right => self.page(true).await,
            AppAction::Left => self.page(false).await,
            AppAction::Submit => {
                self.open_edit();
                Ok(())
            }
            AppAction::Delete => {
                self.open_delete();
                Ok(())
            }
            AppAction::Input(ch) => self.handle_list_char(ch).await,
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.toast_error(&err);
        }
    }

    async fn handle_list_char(&mut self, ch: char) -> std::result::Result<(), EngineError> {
        if let Some(index) = ch.to_digit(10) {
            if let Some(section) = (index as usize)
                .checked_sub(1)
                .and_then(|i| Section::ALL.get(i))
            {
                return self.switch_section(*section).await;
            }
            return Ok(());
        }

        match ch {
            'q' => {
                self.should_quit = true;
                Ok(())
            }
            'j' => {
                self.select_next();
                Ok(())
            }
            'k' => {
                self.state.selected = self.state.selected.saturating_sub(1);
                Ok(())
            }
            'n' => self.page(true).await,
            'p' => self.page(false).await,
            'r' => {
                let result = self.console.refresh().await;
                self.clamp_selection();
                result
            }
            'R' => {
                let errors = self.console.reload_dictionaries().await;
                match errors.first() {
                    Some(err) => self.toast_error(err),
                    None => self.toast(ToastLevel::Info, "Dictionaries reloaded".to_string()),
                }
                Ok(())
            }
            'a' => {
                self.open_create();
                Ok(())
            }
            'e' => {
                self.open_edit();
                Ok(())
            }
            'd' => {
                self.open_delete();
                Ok(())
            }
            'z' => self.cycle_page_size().await,
            _ if self.state.section == Section::CashFlows => self.handle_filter_char(ch).await,
            _ => Ok(()),
        }
    }

    async fn handle_filter_char(&mut self, ch: char) -> std::result::Result<(), EngineError> {
        let dict = self.console.dictionaries();
        let filter = self.console.filter().clone();
        let forward = ch.is_lowercase();

        let result = match ch.to_ascii_lowercase() {
            't' => {
                let options: Vec<Id> = dict.types.iter().map(|ty| ty.id).collect();
                let next = modal::cycle(&options, filter.type_id, forward);
                self.console.set_type(next).await
            }
            'c' => {
                let options: Vec<Id> = match filter.type_id {
                    Some(type_id) => dict.categories_of(type_id).map(|c| c.id).collect(),
                    None => dict.categories.iter().map(|c| c.id).collect(),
                };
                let next = modal::cycle(&options, filter.category_id, forward);
                self.console.set_category(next).await
            }
            'u' => {
                let options: Vec<Id> = match filter.category_id {
                    Some(category_id) => dict.subcategories_of(category_id).map(|s| s.id).collect(),
                    None => dict.subcategories.iter().map(|s| s.id).collect(),
                };
                let next = modal::cycle(&options, filter.subcategory_id, forward);
                self.console.set_subcategory(next).await
            }
            's' => {
                let options: Vec<Id> = dict.statuses.iter().map(|s| s.id).collect();
                let next = modal::cycle(&options, filter.status_id, forward);
                self.console.set_status(next).await
            }
            'f' => {
                let format = |day: Option<NaiveDate>| {
                    day.map(|day| day.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                };
                self.state.modal = Some(Modal::DateRange {
                    after: format(filter.created.after),
                    before: format(filter.created.before),
                    editing_before: false,
                    error: None,
                });
                Ok(())
            }
            'x' => self.console.reset_filters().await,
            _ => Ok(()),
        };
        self.state.selected = 0;
        result
    }

    async fn switch_section(&mut self, section: Section) -> std::result::Result<(), EngineError> {
        self.state.section = section;
        self.state.selected = 0;
        self.console.show(section.view()).await
    }

    async fn page(&mut self, forward: bool) -> std::result::Result<(), EngineError> {
        let result = if forward {
            self.console.next_page().await
        } else {
            self.console.previous_page().await
        };
        if result.is_ok() {
            self.state.selected = 0;
        }
        result
    }

    async fn cycle_page_size(&mut self) -> std::result::Result<(), EngineError> {
        match self.state.section.kind() {
            None => {
                let next = modal::next_page_size(&PAGE_SIZES, self.console.filter().page_size);
                self.console.set_page_size(next).await?;
            }
            Some(kind) => {
                let current = self.console.dictionary_page_size(kind);
                let next = modal::next_page_size(&PAGE_SIZES, current);
                self.console.set_dictionary_page_size(next).await?;
            }
        }
        self.state.selected = 0;
        Ok(())
    }

    fn select_next(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.state.selected = (self.state.selected + 1).min(len - 1);
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.row_count();
        self.state.selected = self.state.selected.min(len.saturating_sub(1));
    }

    fn row_count(&self) -> usize {
        match self.state.section {
            Section::CashFlows => self.console.records().items().len(),
            _ => self.console.browser().items().len(),
        }
    }

    fn open_create(&mut self) {
        self.state.modal = Some(match self.state.section.kind() {
            None => Modal::CashFlowForm {
                draft: CashFlowDraft::new(),
                focus: CashFlowField::Status,
                error: None,
            },
            Some(kind) => Modal::DictionaryForm {
                draft: DictionaryDraft::new(kind),
                focus: DictionaryField::Name,
                error: None,
            },
        });
    }

    fn open_edit(&mut self) {
        let index = self.state.selected;
        self.state.modal = match self.state.section.kind() {
            None => self
                .console
                .records()
                .items()
                .get(index)
                .map(|flow| Modal::CashFlowForm {
                    draft: CashFlowDraft::edit(flow),
                    focus: CashFlowField::Amount,
                    error: None,
                }),
            Some(kind) => self
                .console
                .browser()
                .items()
                .get(index)
                .map(|entry| Modal::DictionaryForm {
                    draft: DictionaryDraft::edit(kind, entry),
                    focus: DictionaryField::Name,
                    error: None,
                }),
        };
    }

    fn open_delete(&mut self) {
        let index = self.state.selected;
        self.state.modal = match self.state.section.kind() {
            None => self
                .console
                .records()
                .items()
                .get(index)
                .map(|flow| Modal::ConfirmDelete {
                    collection: Collection::CashFlows,
                    id: flow.id,
                    label: format!(
                        "{} {} ({})",
                        flow.created_at.format("%d.%m.%Y"),
                        flow.amount,
                        flow.category_name
                    ),
                }),
            Some(kind) => self
                .console
                .browser()
                .items()
                .get(index)
                .map(|entry| Modal::ConfirmDelete {
                    collection: kind.collection(),
                    id: entry.id,
                    label: format!("{} \"{}\"", kind.label().to_lowercase(), entry.name),
                }),
        };
    }

    async fn handle_modal(&mut self, mut modal: Modal, action: AppAction) {
        if action == AppAction::Cancel {
            return;
        }

        let submitted = match &mut modal {
            Modal::CashFlowForm { draft, focus, error } => {
                self.cash_flow_form_key(draft, focus, error, action)
            }
            Modal::DictionaryForm { draft, focus, error } => {
                dictionary_form_key(draft, focus, error, action, &self.console)
            }
            Modal::ConfirmDelete { .. } => match action {
                AppAction::Submit | AppAction::Input('y') => true,
                AppAction::Input('n') => return,
                _ => false,
            },
            Modal::DateRange {
                after,
                before,
                editing_before,
                ..
            } => date_range_key(after, before, editing_before, action),
        };

        if !submitted {
            self.state.modal = Some(modal);
            return;
        }

        match self.submit(&modal).await {
            Ok(Some(applied)) => self.report(&applied),
            Ok(None) => {}
            Err(err) if matches!(modal, Modal::ConfirmDelete { .. }) => self.toast_error(&err),
            Err(err) => {
                modal.set_error(ui::message_for_error(&err));
                self.state.modal = Some(modal);
            }
        }
    }

    fn cash_flow_form_key(
        &self,
        draft: &mut CashFlowDraft,
        focus: &mut CashFlowField,
        error: &mut Option<String>,
        action: AppAction,
    ) -> bool {
        match action {
            AppAction::Submit => return true,
            AppAction::NextField | AppAction::Down => *focus = focus.next(),
            AppAction::PrevField | AppAction::Up => *focus = focus.prev(),
            AppAction::Left | AppAction::Right if focus.is_selector() => {
                let forward = action == AppAction::Right;
                let dict = self.console.dictionaries();
                let result = match focus {
                    CashFlowField::Status => {
                        let options: Vec<Id> = dict.statuses.iter().map(|s| s.id).collect();
                        draft.set_status(modal::cycle(&options, draft.status_id, forward), &dict)
                    }
                    CashFlowField::Type => {
                        let options: Vec<Id> = dict.types.iter().map(|t| t.id).collect();
                        draft.set_type(modal::cycle(&options, draft.type_id, forward), &dict)
                    }
                    CashFlowField::Category => {
                        let options: Vec<Id> = draft
                            .type_id
                            .map(|type_id| dict.categories_of(type_id).map(|c| c.id).collect())
                            .unwrap_or_default();
                        draft.set_category(
                            modal::cycle(&options, draft.category_id, forward),
                            &dict,
                        )
                    }
                    CashFlowField::Subcategory => {
                        let options: Vec<Id> = draft
                            .category_id
                            .map(|category_id| {
                                dict.subcategories_of(category_id).map(|s| s.id).collect()
                            })
                            .unwrap_or_default();
                        draft.set_subcategory(
                            modal::cycle(&options, draft.subcategory_id, forward),
                            &dict,
                        )
                    }
                    CashFlowField::Amount | CashFlowField::Comment => Ok(()),
                };
                *error = result.err().map(|err| ui::message_for_error(&err));
            }
            AppAction::Input(ch) => match focus {
                CashFlowField::Amount => draft.amount.push(ch),
                CashFlowField::Comment => draft.comment.push(ch),
                _ => {}
            },
            AppAction::Backspace => match focus {
                CashFlowField::Amount => {
                    draft.amount.pop();
                }
                CashFlowField::Comment => {
                    draft.comment.pop();
                }
                _ => {}
            },
            _ => {}
        }
        false
    }

    /// Sends a submitted dialog. `Ok(None)` when nothing was written.
    async fn submit(&mut self, modal: &Modal) -> std::result::Result<Option<Applied>, EngineError> {
        match modal {
            Modal::CashFlowForm { draft, .. } => {
                self.console.save_cash_flow(draft).await.map(Some)
            }
            Modal::DictionaryForm { draft, .. } => {
                self.console.save_dictionary(draft).await.map(Some)
            }
            Modal::ConfirmDelete { collection, id, .. } => {
                self.console.delete(*collection, *id).await.map(Some)
            }
            Modal::DateRange { after, before, .. } => {
                let range = DateRange::new(parse_day(after)?, parse_day(before)?)?;
                self.console.set_date_range(range).await?;
                self.state.selected = 0;
                Ok(None)
            }
        }
    }

    fn report(&mut self, applied: &Applied) {
        self.clamp_selection();
        match applied.refresh_errors.first() {
            Some(err) => self.toast(
                ToastLevel::Error,
                format!("Saved, but refresh failed: {}", ui::message_for_error(err)),
            ),
            None => self.toast(ToastLevel::Success, "Saved".to_string()),
        }
    }

    fn toast_error(&mut self, err: &EngineError) {
        tracing::warn!("operator action failed: {err}");
        self.toast(ToastLevel::Error, ui::message_for_error(err));
    }

    fn toast(&mut self, level: ToastLevel, message: String) {
        self.state.toast = Some(ToastState {
            message,
            level,
            expires_at: Instant::now() + TOAST_TTL,
        });
    }
}

fn dictionary_form_key(
    draft: &mut DictionaryDraft,
    focus: &mut DictionaryField,
    error: &mut Option<String>,
    action: AppAction,
    console: &Console,
) -> bool {
    let has_parent = draft.kind.parent().is_some();
    match action {
        AppAction::Submit => return true,
        AppAction::NextField | AppAction::PrevField | AppAction::Up | AppAction::Down
            if has_parent =>
        {
            *focus = match focus {
                DictionaryField::Name => DictionaryField::Parent,
                DictionaryField::Parent => DictionaryField::Name,
            };
        }
        AppAction::Left | AppAction::Right if *focus == DictionaryField::Parent => {
            if let Some(parent) = draft.kind.parent() {
                let options: Vec<Id> = console
                    .dictionaries()
                    .options(parent)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect();
                draft.parent_id =
                    modal::cycle(&options, draft.parent_id, action == AppAction::Right);
                *error = None;
            }
        }
        AppAction::Input(ch) if *focus == DictionaryField::Name => draft.name.push(ch),
        AppAction::Backspace if *focus == DictionaryField::Name => {
            draft.name.pop();
        }
        _ => {}
    }
    false
}

fn date_range_key(
    after: &mut String,
    before: &mut String,
    editing_before: &mut bool,
    action: AppAction,
) -> bool {
    let field = if *editing_before { before } else { after };
    match action {
        AppAction::Submit => return true,
        AppAction::NextField | AppAction::PrevField | AppAction::Up | AppAction::Down => {
            *editing_before = !*editing_before;
        }
        AppAction::Input(ch) if ch.is_ascii_digit() || ch == '-' => field.push(ch),
        AppAction::Backspace => {
            field.pop();
        }
        _ => {}
    }
    false
}

fn parse_day(raw: &str) -> std::result::Result<Option<NaiveDate>, EngineError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| EngineError::ValidationFailed(format!("\"{raw}\" is not a YYYY-MM-DD date")))
}
