pub mod error;
pub mod record;

pub use error::{ContribError, Result};
pub use record::{
    AiInsights, AnalysisRecord, AnalysisStatus, ContributionGuide, IssueRoadmap,
    IssueRoadmapEntry, PrPreparationHelp,
};
