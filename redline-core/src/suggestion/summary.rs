//! Human-readable summaries of a suggestion, sent along with thread
//! creation, and the metric bucket each summary type is counted under.

use serde::{Deserialize, Serialize};

use crate::document::EditorState;
use crate::node::{Alignment, NodeKey, NodeKind};
use crate::ops;
use crate::suggestion::{SuggestionChange, SuggestionType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionSummaryType {
    Insert,
    Delete,
    Replace,
    PropertyChange,
    StyleChange,
    Split,
    Join,
    LinkChange,
    AddLink,
    DeleteLink,
    ImageChange,
    InsertImage,
    DeleteImage,
    IndentChange,
    InsertTable,
    DeleteTable,
    InsertTableRow,
    DuplicateTableRow,
    DeleteTableRow,
    InsertTableColumn,
    DeleteTableColumn,
    DuplicateTableColumn,
    BlockTypeChange,
    InsertDivider,
    DeleteDivider,
    ClearFormatting,
    AlignChange,
}

impl From<SuggestionType> for SuggestionSummaryType {
    fn from(ty: SuggestionType) -> Self {
        match ty {
            SuggestionType::Insert => Self::Insert,
            SuggestionType::Delete => Self::Delete,
            SuggestionType::PropertyChange => Self::PropertyChange,
            SuggestionType::StyleChange => Self::StyleChange,
            SuggestionType::Split => Self::Split,
            SuggestionType::Join => Self::Join,
            SuggestionType::LinkChange => Self::LinkChange,
            SuggestionType::AddLink => Self::AddLink,
            SuggestionType::DeleteLink => Self::DeleteLink,
            SuggestionType::ImageChange => Self::ImageChange,
            SuggestionType::InsertImage => Self::InsertImage,
            SuggestionType::DeleteImage => Self::DeleteImage,
            SuggestionType::IndentChange => Self::IndentChange,
            SuggestionType::InsertTable => Self::InsertTable,
            SuggestionType::DeleteTable => Self::DeleteTable,
            SuggestionType::InsertTableRow => Self::InsertTableRow,
            SuggestionType::DuplicateTableRow => Self::DuplicateTableRow,
            SuggestionType::DeleteTableRow => Self::DeleteTableRow,
            SuggestionType::InsertTableColumn => Self::InsertTableColumn,
            SuggestionType::DeleteTableColumn => Self::DeleteTableColumn,
            SuggestionType::DuplicateTableColumn => Self::DuplicateTableColumn,
            SuggestionType::BlockTypeChange => Self::BlockTypeChange,
            SuggestionType::InsertDivider => Self::InsertDivider,
            SuggestionType::DeleteDivider => Self::DeleteDivider,
            SuggestionType::ClearFormatting => Self::ClearFormatting,
            SuggestionType::AlignChange => Self::AlignChange,
        }
    }
}

impl SuggestionSummaryType {
    /// Types whose content is the wrapped text and can be concatenated.
    fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Insert
                | Self::Delete
                | Self::Replace
                | Self::PropertyChange
                | Self::StyleChange
                | Self::ClearFormatting
                | Self::DeleteLink
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSummaryItem {
    #[serde(rename = "type")]
    pub summary_type: SuggestionSummaryType,
    pub content: String,
    #[serde(rename = "replaceWith", default, skip_serializing_if = "Option::is_none")]
    pub replace_with: Option<String>,
}

impl SuggestionSummaryItem {
    fn new(summary_type: SuggestionSummaryType, content: String) -> Self {
        Self {
            summary_type,
            content,
            replace_with: None,
        }
    }
}

fn alignment_name(align: Alignment) -> &'static str {
    match align {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "justify",
    }
}

fn image_src(state: &EditorState, key: NodeKey) -> String {
    ops::descendants(state, key)
        .into_iter()
        .find_map(|k| match &state.get(k)?.kind {
            NodeKind::Image(image) => Some(image.src.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn item_for(state: &EditorState, key: NodeKey) -> Option<SuggestionSummaryItem> {
    let props = state.get(key)?.as_suggestion()?;
    let summary_type = SuggestionSummaryType::from(props.suggestion_type);
    let content = match (&props.change, props.suggestion_type) {
        (_, SuggestionType::InsertImage | SuggestionType::DeleteImage) => image_src(state, key),
        (SuggestionChange::Align { to, .. }, _) => alignment_name(*to).to_string(),
        (SuggestionChange::Indent { delta }, _) => format!("{delta:+}"),
        (SuggestionChange::BlockType { to, .. }, _) => to.to_string(),
        (SuggestionChange::ImageSize { to: (w, h), .. }, _) => format!("{w}x{h}"),
        (SuggestionChange::Link { to: Some(url), .. }, _) => url.clone(),
        _ => state.text_content(key),
    };
    Some(SuggestionSummaryItem::new(summary_type, content))
}

/// Summarizes the nodes of one suggestion in document order. Adjacent items
/// of the same type are merged and a deletion directly followed by an
/// insertion becomes a replacement.
pub fn generate_summary<I>(state: &EditorState, keys: I) -> Vec<SuggestionSummaryItem>
where
    I: IntoIterator<Item = NodeKey>,
{
    let wanted: std::collections::HashSet<NodeKey> = keys.into_iter().collect();
    let mut items: Vec<SuggestionSummaryItem> = Vec::new();

    for key in state.document_order() {
        if !wanted.contains(&key) {
            continue;
        }
        let Some(item) = item_for(state, key) else {
            continue;
        };
        let Some(last) = items.last_mut() else {
            items.push(item);
            continue;
        };
        use SuggestionSummaryType as T;
        match (last.summary_type, item.summary_type) {
            (T::Delete, T::Insert) => {
                last.summary_type = T::Replace;
                last.replace_with = Some(item.content);
            }
            (T::Replace, T::Insert) => {
                last.replace_with
                    .get_or_insert_with(String::new)
                    .push_str(&item.content);
            }
            (a, b) if a == b && a.is_textual() => last.content.push_str(&item.content),
            (a, b) if a == b && last.content == item.content => {}
            _ => items.push(item),
        }
    }
    items
}

/// Coarse bucket a suggestion is counted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSuggestionType {
    Insertion,
    Replacement,
    Deletion,
    Formatting,
    Style,
    Other,
}

impl From<SuggestionSummaryType> for MetricSuggestionType {
    fn from(ty: SuggestionSummaryType) -> Self {
        use SuggestionSummaryType as T;
        match ty {
            T::Insert
            | T::Split
            | T::InsertImage
            | T::InsertTable
            | T::InsertTableRow
            | T::DuplicateTableRow
            | T::InsertTableColumn
            | T::DuplicateTableColumn
            | T::InsertDivider => Self::Insertion,
            T::Delete
            | T::Join
            | T::DeleteImage
            | T::DeleteTable
            | T::DeleteTableRow
            | T::DeleteTableColumn
            | T::DeleteDivider => Self::Deletion,
            T::PropertyChange | T::StyleChange | T::ClearFormatting => Self::Style,
            T::IndentChange | T::AlignChange => Self::Formatting,
            T::Replace => Self::Replacement,
            T::LinkChange | T::AddLink | T::DeleteLink | T::ImageChange | T::BlockTypeChange => {
                Self::Other
            }
        }
    }
}

impl MetricSuggestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insertion => "insertion",
            Self::Replacement => "replacement",
            Self::Deletion => "deletion",
            Self::Formatting => "formatting",
            Self::Style => "style",
            Self::Other => "other",
        }
    }
}

/// Bucket for a suggestion whose type may be unknown.
pub fn metric_type(ty: Option<SuggestionSummaryType>) -> MetricSuggestionType {
    ty.map_or(MetricSuggestionType::Other, MetricSuggestionType::from)
}

/// Counter of suggestions whose thread was created, labelled by bucket.
pub const SUGGESTIONS_CREATED: &str = "docs_suggestions_created_total";
/// Counter of resolved suggestions, labelled `accepted` or `rejected`.
pub const SUGGESTIONS_RESOLVED: &str = "docs_suggestions_resolved_total";

pub fn record_created(ty: Option<SuggestionSummaryType>) {
    metrics::counter!(SUGGESTIONS_CREATED, "type" => metric_type(ty).as_str()).increment(1);
}

pub fn record_resolved(accepted: bool) {
    let resolution = if accepted { "accepted" } else { "rejected" };
    metrics::counter!(SUGGESTIONS_RESOLVED, "type" => resolution).increment(1);
}

/// In-memory recorder for asserting on the counters above.
#[cfg(test)]
pub(crate) mod counting {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use metrics::{
        Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };

    type Counts = Arc<Mutex<BTreeMap<String, u64>>>;

    #[derive(Default)]
    pub struct CountingRecorder {
        counts: Counts,
    }

    struct Handle {
        key: String,
        counts: Counts,
    }

    impl CounterFn for Handle {
        fn increment(&self, value: u64) {
            *self.counts.lock().unwrap().entry(self.key.clone()).or_default() += value;
        }

        fn absolute(&self, value: u64) {
            self.counts.lock().unwrap().insert(self.key.clone(), value);
        }
    }

    impl CountingRecorder {
        /// Count for `name{type=label}`.
        pub fn get(&self, name: &str, label: &str) -> u64 {
            let key = format!("{name}{{type={label}}}");
            self.counts.lock().unwrap().get(&key).copied().unwrap_or(0)
        }

        /// Runs `f` with this recorder installed on the current thread.
        pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
            metrics::with_local_recorder(self, f)
        }
    }

    impl Recorder for CountingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let labels: Vec<String> = key
                .labels()
                .map(|l| format!("{}={}", l.key(), l.value()))
                .collect();
            Counter::from_arc(Arc::new(Handle {
                key: format!("{}{{{}}}", key.name(), labels.join(",")),
                counts: self.counts.clone(),
            }))
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }
}
