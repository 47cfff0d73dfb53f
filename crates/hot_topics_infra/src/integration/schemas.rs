use crate::glue::{Column, GlueType};

/// Analysis outputs that land in their own catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Sentiment,
    Entity,
    KeyPhrase,
    Topics,
    TopicMappings,
    TxtInImgEntity,
    TxtInImgSentiment,
    TxtInImgKeyPhrase,
    ModerationLabels,
}

/// Which inference namespace publishes events for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceSource {
    TextAnalysis,
    TopicsAnalysis,
    TopicMappings,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 9] = [
        Self::Sentiment,
        Self::Entity,
        Self::KeyPhrase,
        Self::Topics,
        Self::TopicMappings,
        Self::TxtInImgEntity,
        Self::TxtInImgSentiment,
        Self::TxtInImgKeyPhrase,
        Self::ModerationLabels,
    ];

    pub fn from_logical_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.logical_name() == name)
    }

    /// Name used as the table-mapping key and as the event `detail-type`.
    pub fn logical_name(self) -> &'static str {
        match self {
            Self::Sentiment => "Sentiment",
            Self::Entity => "Entity",
            Self::KeyPhrase => "KeyPhrase",
            Self::Topics => "Topics",
            Self::TopicMappings => "TopicMappings",
            Self::TxtInImgEntity => "TxtInImgEntity",
            Self::TxtInImgSentiment => "TxtInImgSentiment",
            Self::TxtInImgKeyPhrase => "TxtInImgKeyPhrase",
            Self::ModerationLabels => "ModerationLabels",
        }
    }

    pub fn default_table_name(self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Entity => "entity",
            Self::KeyPhrase => "keyphrase",
            Self::Topics => "topics",
            Self::TopicMappings => "topic-mappings",
            Self::TxtInImgEntity => "txtinimgentity",
            Self::TxtInImgSentiment => "txtinimgsentiment",
            Self::TxtInImgKeyPhrase => "txtinimgkeyphrase",
            Self::ModerationLabels => "moderationlabels",
        }
    }

    pub fn source(self) -> InferenceSource {
        match self {
            Self::Topics => InferenceSource::TopicsAnalysis,
            Self::TopicMappings => InferenceSource::TopicMappings,
            _ => InferenceSource::TextAnalysis,
        }
    }

    /// Column schema; every table is partitioned by `created_at` separately.
    pub fn columns(self) -> Vec<Column> {
        use GlueType::{Double, Int, String as Str, Timestamp};

        let post = |extra: &[(&str, GlueType)]| -> Vec<Column> {
            let mut columns = vec![
                Column::new("account_name", Str),
                Column::new("platform", Str),
                Column::new("search_query", Str),
                Column::new("id_str", Str),
            ];
            columns.extend(
                extra
                    .iter()
                    .map(|(name, column_type)| Column::new(name, column_type.clone())),
            );
            columns
        };

        match self {
            Self::Sentiment => post(&[
                ("text", Str),
                ("translated_text", Str),
                ("sentiment", Str),
                ("sentimentposscore", Double),
                ("sentimentnegscore", Double),
                ("sentimentneuscore", Double),
                ("sentimentmixedscore", Double),
            ]),
            Self::Entity => post(&[
                ("text", Str),
                ("translated_text", Str),
                ("entity_text", Str),
                ("entity_type", Str),
                ("entity_score", Double),
                ("entity_begin_offset", Int),
                ("entity_end_offset", Int),
            ]),
            Self::KeyPhrase => post(&[
                ("text", Str),
                ("translated_text", Str),
                ("phrase", Str),
                ("phrase_score", Double),
                ("phrase_begin_offset", Int),
                ("phrase_end_offset", Int),
            ]),
            Self::Topics => vec![
                Column::new("job_id", Str),
                Column::new("job_timestamp", Timestamp),
                Column::new("topic", Str),
                Column::new("term", Str),
                Column::new("weight", Double),
            ],
            Self::TopicMappings => crate::visualization::topic_mappings::topic_mappings_columns(),
            Self::TxtInImgEntity => post(&[
                ("image_url", Str),
                ("text", Str),
                ("entity_text", Str),
                ("entity_type", Str),
                ("entity_score", Double),
                ("entity_begin_offset", Int),
                ("entity_end_offset", Int),
            ]),
            Self::TxtInImgSentiment => post(&[
                ("image_url", Str),
                ("text", Str),
                ("sentiment", Str),
                ("sentimentposscore", Double),
                ("sentimentnegscore", Double),
                ("sentimentneuscore", Double),
                ("sentimentmixedscore", Double),
            ]),
            Self::TxtInImgKeyPhrase => post(&[
                ("image_url", Str),
                ("text", Str),
                ("phrase", Str),
                ("phrase_score", Double),
                ("phrase_begin_offset", Int),
                ("phrase_end_offset", Int),
            ]),
            Self::ModerationLabels => post(&[
                ("image_url", Str),
                ("label_name", Str),
                ("parent_name", Str),
                ("confidence", Double),
            ]),
        }
    }
}
