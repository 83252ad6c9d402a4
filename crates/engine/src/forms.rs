//! Drafts behind the create/edit dialogs.
//!
//! A draft holds raw operator input and turns into a [`Payload`] only
//! through `validate`, which never talks to the server.
use std::str::FromStr;

use api_types::{
    Id,
    cash_flow::{CashFlow, CashFlowNew},
    category::CategoryNew,
    dictionary::{DictionaryEntry, NameNew},
    subcategory::SubcategoryNew,
};
use rust_decimal::Decimal;

use crate::{
    ResultEngine,
    dictionary::{Dictionaries, DictionaryKind},
    error::EngineError,
    mutation::Payload,
};

pub const MAX_NAME_LEN: usize = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CashFlowDraft {
    /// Row being edited; `None` when creating.
    pub id: Option<Id>,
    pub status_id: Option<Id>,
    pub type_id: Option<Id>,
    pub category_id: Option<Id>,
    pub subcategory_id: Option<Id>,
    pub amount: String,
    pub comment: String,
}

impl CashFlowDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(flow: &CashFlow) -> Self {
        Self {
            id: Some(flow.id),
            status_id: Some(flow.status_id),
            type_id: Some(flow.type_id),
            category_id: Some(flow.category_id),
            subcategory_id: Some(flow.subcategory_id),
            amount: flow.amount.to_string(),
            comment: flow.comment.clone(),
        }
    }

    pub fn set_status(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_status(id)?;
        }
        self.status_id = id;
        Ok(())
    }

    pub fn set_type(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_type(id)?;
        }
        self.type_id = id;
        self.category_id = None;
        self.subcategory_id = None;
        Ok(())
    }

    pub fn set_category(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_category_of(self.type_id, id)?;
        }
        self.category_id = id;
        self.subcategory_id = None;
        Ok(())
    }

    pub fn set_subcategory(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_subcategory_of(self.category_id, id)?;
        }
        self.subcategory_id = id;
        Ok(())
    }

    pub fn validate(&self, dict: &Dictionaries) -> ResultEngine<Payload> {
        let status_id = required(self.status_id, "status")?;
        let type_id = required(self.type_id, "type")?;
        let category_id = required(self.category_id, "category")?;
        let subcategory_id = required(self.subcategory_id, "subcategory")?;

        dict.require_status(status_id)?;
        dict.require_type(type_id)?;
        dict.require_category_of(Some(type_id), category_id)?;
        dict.require_subcategory_of(Some(category_id), subcategory_id)?;

        let amount = parse_amount(&self.amount)?;
        let comment = self.comment.trim();

        Ok(Payload::CashFlow(CashFlowNew {
            status_id,
            type_id,
            category_id,
            subcategory_id,
            amount,
            comment: (!comment.is_empty()).then(|| comment.to_string()),
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictionaryDraft {
    pub kind: DictionaryKind,
    pub id: Option<Id>,
    pub name: String,
    /// Type of a category or category of a subcategory.
    pub parent_id: Option<Id>,
}

impl DictionaryDraft {
    pub fn new(kind: DictionaryKind) -> Self {
        Self {
            kind,
            id: None,
            name: String::new(),
            parent_id: None,
        }
    }

    pub fn edit(kind: DictionaryKind, entry: &DictionaryEntry) -> Self {
        Self {
            kind,
            id: Some(entry.id),
            name: entry.name.clone(),
            parent_id: entry.parent_id,
        }
    }

    pub fn validate(&self, dict: &Dictionaries) -> ResultEngine<Payload> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EngineError::ValidationFailed("name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(EngineError::ValidationFailed(format!(
                "name is longer than {MAX_NAME_LEN} characters"
            )));
        }
        let name = name.to_string();

        Ok(match self.kind {
            DictionaryKind::Status => Payload::Status(NameNew { name }),
            DictionaryKind::Type => Payload::Type(NameNew { name }),
            DictionaryKind::Category => {
                let type_id = required(self.parent_id, "type")?;
                dict.require_type(type_id)?;
                Payload::Category(CategoryNew { name, type_id })
            }
            DictionaryKind::Subcategory => {
                let category_id = required(self.parent_id, "category")?;
                if dict.category(category_id).is_none() {
                    return Err(EngineError::InvalidReference(format!(
                        "category {category_id}"
                    )));
                }
                Payload::Subcategory(SubcategoryNew { name, category_id })
            }
        })
    }
}

fn required(id: Option<Id>, field: &str) -> ResultEngine<Id> {
    id.ok_or_else(|| EngineError::ValidationFailed(format!("{field} is required")))
}

/// Accepts `1250.50` as well as `1 250,50`.
fn parse_amount(raw: &str) -> ResultEngine<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(EngineError::ValidationFailed("amount is required".to_string()));
    }
    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| EngineError::ValidationFailed(format!("\"{raw}\" is not an amount")))?;
    if amount <= Decimal::ZERO {
        return Err(EngineError::ValidationFailed(
            "amount must be positive".to_string(),
        ));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use api_types::{
        cash_flow_type::CashFlowType, category::Category, status::Status,
        subcategory::Subcategory,
    };

    use super::*;

    fn dict() -> Dictionaries {
        Dictionaries {
            statuses: vec![Status {
                id: 1,
                name: "Business".into(),
            }],
            types: vec![CashFlowType {
                id: 1,
                name: "Income".into(),
            }],
            categories: vec![Category {
                id: 4,
                name: "Salary".into(),
                type_id: 1,
                type_name: "Income".into(),
            }],
            subcategories: vec![Subcategory {
                id: 9,
                name: "Bonus".into(),
                category_id: 4,
                category_name: "Salary".into(),
            }],
        }
    }

    fn filled() -> CashFlowDraft {
        let dict = dict();
        let mut draft = CashFlowDraft::new();
        draft.set_status(Some(1), &dict).unwrap();
        draft.set_type(Some(1), &dict).unwrap();
        draft.set_category(Some(4), &dict).unwrap();
        draft.set_subcategory(Some(9), &dict).unwrap();
        draft.amount = "1 250,50".into();
        draft
    }

    #[test]
    fn complete_draft_becomes_payload() {
        let payload = filled().validate(&dict()).unwrap();
        let Payload::CashFlow(flow) = payload else {
            panic!("expected a cash flow payload");
        };
        assert_eq!(flow.amount, Decimal::from_str("1250.50").unwrap());
        assert_eq!(flow.comment, None);
    }

    #[test]
    fn amount_must_be_positive_number() {
        for raw in ["", "abc", "0", "-5"] {
            let mut draft = filled();
            draft.amount = raw.into();
            assert!(
                matches!(draft.validate(&dict()), Err(EngineError::ValidationFailed(_))),
                "{raw:?} accepted"
            );
        }
    }

    #[test]
    fn type_change_clears_classification() {
        let dict = dict();
        let mut draft = filled();
        draft.set_type(None, &dict).unwrap();
        assert_eq!((draft.category_id, draft.subcategory_id), (None, None));
        assert!(matches!(
            draft.validate(&dict),
            Err(EngineError::ValidationFailed(_))
        ));
    }

    #[test]
    fn stale_ids_are_invalid_references() {
        let mut draft = filled();
        let mut dict = dict();
        dict.subcategories.clear();
        assert!(matches!(
            draft.validate(&dict),
            Err(EngineError::InvalidReference(_))
        ));
        assert!(matches!(
            draft.set_subcategory(Some(9), &dict),
            Err(EngineError::InvalidReference(_))
        ));
    }

    #[test]
    fn dictionary_names_are_checked() {
        let dict = dict();
        let mut draft = DictionaryDraft::new(DictionaryKind::Status);
        draft.name = "   ".into();
        assert!(matches!(
            draft.validate(&dict),
            Err(EngineError::ValidationFailed(_))
        ));
        draft.name = "x".repeat(101);
        assert!(draft.validate(&dict).is_err());

        let mut draft = DictionaryDraft::new(DictionaryKind::Subcategory);
        draft.name = " Bonus ".into();
        assert!(draft.validate(&dict).is_err());
        draft.parent_id = Some(4);
        assert_eq!(
            draft.validate(&dict).unwrap(),
            Payload::Subcategory(SubcategoryNew {
                name: "Bonus".into(),
                category_id: 4
            })
        );
    }
}
