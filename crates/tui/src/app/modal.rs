use api_types::Id;
use engine::{CashFlowDraft, Collection, DictionaryDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashFlowField {
    Status,
    Type,
    Category,
    Subcategory,
    Amount,
    Comment,
}

impl CashFlowField {
    const ORDER: [Self; 6] = [
        Self::Status,
        Self::Type,
        Self::Category,
        Self::Subcategory,
        Self::Amount,
        Self::Comment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Type => "Type",
            Self::Category => "Category",
            Self::Subcategory => "Subcategory",
            Self::Amount => "Amount",
            Self::Comment => "Comment",
        }
    }

    pub fn all() -> [Self; 6] {
        Self::ORDER
    }

    pub fn is_selector(self) -> bool {
        !matches!(self, Self::Amount | Self::Comment)
    }

    pub fn next(self) -> Self {
        step(&Self::ORDER, self, true)
    }

    pub fn prev(self) -> Self {
        step(&Self::ORDER, self, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryField {
    Name,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    CashFlowForm {
        draft: CashFlowDraft,
        focus: CashFlowField,
        error: Option<String>,
    },
    DictionaryForm {
        draft: DictionaryDraft,
        focus: DictionaryField,
        error: Option<String>,
    },
    ConfirmDelete {
        collection: Collection,
        id: Id,
        label: String,
    },
    DateRange {
        after: String,
        before: String,
        editing_before: bool,
        error: Option<String>,
    },
}

impl Modal {
    pub fn title(&self) -> String {
        match self {
            Self::CashFlowForm { draft, .. } => match draft.id {
                Some(id) => format!("Edit cash flow #{id}"),
                None => "New cash flow".to_string(),
            },
            Self::DictionaryForm { draft, .. } => match draft.id {
                Some(id) => format!("Edit {} #{id}", draft.kind.label().to_lowercase()),
                None => format!("New {}", draft.kind.label().to_lowercase()),
            },
            Self::ConfirmDelete { .. } => "Confirm delete".to_string(),
            Self::DateRange { .. } => "Created between".to_string(),
        }
    }

    pub fn set_error(&mut self, message: String) {
        match self {
            Self::CashFlowForm { error, .. }
            | Self::DictionaryForm { error, .. }
            | Self::DateRange { error, .. } => *error = Some(message),
            Self::ConfirmDelete { .. } => {}
        }
    }
}

/// Next value of a selector: nothing, then each option in turn, then
/// nothing again.
pub fn cycle(options: &[Id], current: Option<Id>, forward: bool) -> Option<Id> {
    let position = current.and_then(|id| options.iter().position(|option| *option == id));
    if forward {
        match position {
            None => options.first().copied(),
            Some(index) => options.get(index + 1).copied(),
        }
    } else {
        match position {
            None => options.last().copied(),
            Some(0) => None,
            Some(index) => options.get(index - 1).copied(),
        }
    }
}

/// Page size following `current` in `sizes`, wrapping around.
pub fn next_page_size(sizes: &[u32], current: u32) -> u32 {
    sizes
        .iter()
        .copied()
        .find(|size| *size > current)
        .or_else(|| sizes.first().copied())
        .unwrap_or(current)
}

fn step<T: Copy + PartialEq>(order: &[T], current: T, forward: bool) -> T {
    let len = order.len();
    let index = order.iter().position(|item| *item == current).unwrap_or(0);
    let next = if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    };
    order[next]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_walks_through_none() {
        let options = [4, 5, 6];
        assert_eq!(cycle(&options, None, true), Some(4));
        assert_eq!(cycle(&options, Some(5), true), Some(6));
        assert_eq!(cycle(&options, Some(6), true), None);
        assert_eq!(cycle(&options, None, false), Some(6));
        assert_eq!(cycle(&options, Some(4), false), None);
        // a value no longer offered restarts the cycle
        assert_eq!(cycle(&options, Some(99), true), Some(4));
        assert_eq!(cycle(&[], None, true), None);
    }

    #[test]
    fn page_sizes_wrap() {
        let sizes = [5, 10, 25, 50, 100];
        assert_eq!(next_page_size(&sizes, 10), 25);
        assert_eq!(next_page_size(&sizes, 100), 5);
        assert_eq!(next_page_size(&sizes, 7), 10);
    }

    #[test]
    fn fields_wrap_both_ways() {
        assert_eq!(CashFlowField::Comment.next(), CashFlowField::Status);
        assert_eq!(CashFlowField::Status.prev(), CashFlowField::Comment);
        assert!(CashFlowField::Type.is_selector());
        assert!(!CashFlowField::Amount.is_selector());
    }
}
