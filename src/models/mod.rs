mod article;
mod report;

pub use article::{ArticleRecord, InsertOutcome, RawEntry, SeenArticle};
pub use report::{ArticleView, CheckReport, ClearReport, SourceListing, SourceView};
