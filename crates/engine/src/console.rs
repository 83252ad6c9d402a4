//! The [`Console`] facade: one owner for every piece of client state.
//!
//! It holds the dictionary cache, the record filter, the record pager, the
//! dictionary browsing pager and the active [`View`], and routes each
//! operator action to the component that owns the affected state.
use std::collections::HashMap;

use api_types::{Id, cash_flow::CashFlow, dictionary::DictionaryEntry};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    ResultEngine,
    dictionary::{Dictionaries, DictionaryCache, DictionaryKind},
    error::EngineError,
    filter::{DateRange, FilterMachine, FilterState, check_page_size},
    forms::{CashFlowDraft, DictionaryDraft},
    mutation::{Applied, Coordinator, Targets},
    pager::Pager,
    remote::{Api, Collection, NoFilter},
};

pub use crate::mutation::View;

#[derive(Debug)]
pub struct Console {
    api: Api,
    coordinator: Coordinator,
    cache: DictionaryCache,
    filter: FilterMachine,
    filter_rx: UnboundedReceiver<FilterState>,
    records: Pager<CashFlow, FilterState>,
    browser: Pager<DictionaryEntry, NoFilter>,
    view: View,
    dictionary_page_size: u32,
    dictionary_page_sizes: HashMap<DictionaryKind, u32>,
}

impl Console {
    pub fn new(api: Api, page_size: u32, dictionary_page_size: u32) -> ResultEngine<Self> {
        check_page_size(dictionary_page_size)?;
        let mut filter = FilterMachine::new(page_size)?;
        let filter_rx = filter.subscribe();

        Ok(Self {
            coordinator: Coordinator::new(api.clone()),
            cache: DictionaryCache::new(api.clone()),
            records: Pager::new(
                api.clone(),
                Collection::CashFlows,
                filter.state().clone(),
                page_size,
            ),
            browser: Pager::new(
                api.clone(),
                DictionaryKind::Status.collection(),
                NoFilter,
                dictionary_page_size,
            ),
            api,
            filter,
            filter_rx,
            view: View::Records,
            dictionary_page_size,
            dictionary_page_sizes: HashMap::new(),
        })
    }

    /// Loads the dictionaries and the first record page. Returns what went
    /// wrong; the console stays usable either way.
    pub async fn start(&mut self) -> Vec<EngineError> {
        let mut errors: Vec<EngineError> = self
            .cache
            .load_all()
            .await
            .into_iter()
            .map(|(_, err)| err)
            .collect();

        let state = self.filter.state().clone();
        let page_size = state.page_size;
        if let Err(err) = self.records.load(state, page_size).await {
            errors.push(err);
        }
        errors
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn dictionaries(&self) -> Dictionaries {
        self.cache.snapshot()
    }

    pub fn cache(&self) -> &DictionaryCache {
        &self.cache
    }

    pub fn filter(&self) -> &FilterState {
        self.filter.state()
    }

    pub fn records(&self) -> &Pager<CashFlow, FilterState> {
        &self.records
    }

    pub fn browser(&self) -> &Pager<DictionaryEntry, NoFilter> {
        &self.browser
    }

    pub fn dictionary_page_size(&self, kind: DictionaryKind) -> u32 {
        self.dictionary_page_sizes
            .get(&kind)
            .copied()
            .unwrap_or(self.dictionary_page_size)
    }

    pub async fn set_type(&mut self, id: Option<Id>) -> ResultEngine<()> {
        self.filter.set_type(id, self.cache.data())?;
        self.pump_filters().await
    }

    pub async fn set_category(&mut self, id: Option<Id>) -> ResultEngine<()> {
        self.filter.set_category(id, self.cache.data())?;
        self.pump_filters().await
    }

    pub async fn set_subcategory(&mut self, id: Option<Id>) -> ResultEngine<()> {
        self.filter.set_subcategory(id, self.cache.data())?;
        self.pump_filters().await
    }

    pub async fn set_status(&mut self, id: Option<Id>) -> ResultEngine<()> {
        self.filter.set_status(id, self.cache.data())?;
        self.pump_filters().await
    }

    pub async fn set_date_range(&mut self, range: DateRange) -> ResultEngine<()> {
        self.filter.set_date_range(range)?;
        self.pump_filters().await
    }

    pub async fn set_page_size(&mut self, page_size: u32) -> ResultEngine<()> {
        self.filter.set_page_size(page_size)?;
        self.pump_filters().await
    }

    pub async fn reset_filters(&mut self) -> ResultEngine<()> {
        self.filter.reset();
        self.pump_filters().await
    }

    /// Turns pending filter states into first-page loads. Every state
    /// issues a request so older ones lose; only the newest is fetched.
    pub async fn pump_filters(&mut self) -> ResultEngine<()> {
        let mut latest = None;
        while let Ok(state) = self.filter_rx.try_recv() {
            let page_size = state.page_size;
            latest = Some(self.records.begin_load(state, page_size));
        }

        let Some(req) = latest else {
            return Ok(());
        };
        let result = req.fetch(&self.api).await;
        self.records.complete(req, result).map(|_| ())
    }

    /// Switches the active view. A dictionary view starts on its first page
    /// with its own page size; the record view is refreshed where it was.
    pub async fn show(&mut self, view: View) -> ResultEngine<()> {
        self.view = view;
        match view {
            View::Records => self.records.refresh_in_place().await,
            View::Dictionary(kind) => {
                let page_size = self.dictionary_page_size(kind);
                self.browser.retarget(kind.collection(), NoFilter, page_size);
                self.browser.load(NoFilter, page_size).await
            }
        }
    }

    /// Page size of the dictionary on screen.
    pub async fn set_dictionary_page_size(&mut self, page_size: u32) -> ResultEngine<()> {
        let View::Dictionary(kind) = self.view else {
            return Err(EngineError::PreconditionFailed(
                "no dictionary is shown".to_string(),
            ));
        };
        check_page_size(page_size)?;
        self.dictionary_page_sizes.insert(kind, page_size);
        self.browser.load(NoFilter, page_size).await
    }

    pub async fn next_page(&mut self) -> ResultEngine<()> {
        match self.view {
            View::Records => self.records.next().await,
            View::Dictionary(_) => self.browser.next().await,
        }
    }

    pub async fn previous_page(&mut self) -> ResultEngine<()> {
        match self.view {
            View::Records => self.records.previous().await,
            View::Dictionary(_) => self.browser.previous().await,
        }
    }

    pub async fn refresh(&mut self) -> ResultEngine<()> {
        match self.view {
            View::Records => self.records.refresh_in_place().await,
            View::Dictionary(_) => self.browser.refresh_in_place().await,
        }
    }

    /// Refetches every dictionary, then drops filter selections that
    /// vanished meanwhile.
    pub async fn reload_dictionaries(&mut self) -> Vec<EngineError> {
        let mut errors: Vec<EngineError> = self
            .cache
            .load_all()
            .await
            .into_iter()
            .map(|(_, err)| err)
            .collect();
        if self.filter.revalidate(self.cache.data())
            && let Err(err) = self.pump_filters().await
        {
            errors.push(err);
        }
        errors
    }

    pub async fn save_cash_flow(&mut self, draft: &CashFlowDraft) -> ResultEngine<Applied> {
        let payload = draft.validate(self.cache.data())?;
        let coordinator = self.coordinator.clone();
        let applied = match draft.id {
            Some(id) => coordinator.update(id, &payload, self.targets()).await?,
            None => coordinator.create(&payload, self.targets()).await?,
        };
        Ok(self.settle(applied).await)
    }

    pub async fn save_dictionary(&mut self, draft: &DictionaryDraft) -> ResultEngine<Applied> {
        let payload = draft.validate(self.cache.data())?;
        let coordinator = self.coordinator.clone();
        let applied = match draft.id {
            Some(id) => coordinator.update(id, &payload, self.targets()).await?,
            None => coordinator.create(&payload, self.targets()).await?,
        };
        Ok(self.settle(applied).await)
    }

    pub async fn delete(&mut self, collection: Collection, id: Id) -> ResultEngine<Applied> {
        let coordinator = self.coordinator.clone();
        let applied = coordinator
            .delete(collection, id, self.targets())
            .await?;
        Ok(self.settle(applied).await)
    }

    fn targets(&mut self) -> Targets<'_> {
        Targets {
            cache: &mut self.cache,
            filter: &mut self.filter,
            records: &mut self.records,
            browser: &mut self.browser,
            view: self.view,
        }
    }

    /// A refresh may have dropped filter selections; reload for them.
    async fn settle(&mut self, mut applied: Applied) -> Applied {
        if let Err(err) = self.pump_filters().await {
            applied.refresh_errors.push(err);
        }
        applied
    }
}
