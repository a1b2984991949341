//! Identifiers shared by the metric library, result table and grading engine.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Comparison metrics that can be selected for grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kpi {
    Nmbe,
    Cvrmse,
    HourlyCvrmse,
    DailyAmplitudeCvrmse,
    RSquared,
    Rmse,
    Rmsle,
}

impl Kpi {
    /// Every implemented KPI, in catalog order.
    pub const ALL: [Kpi; 7] = [
        Kpi::Nmbe,
        Kpi::HourlyCvrmse,
        Kpi::DailyAmplitudeCvrmse,
        Kpi::RSquared,
        Kpi::Rmse,
        Kpi::Rmsle,
        Kpi::Cvrmse,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kpi::Nmbe => "NMBE [%]",
            Kpi::Cvrmse => "CVRMSE [%]",
            Kpi::HourlyCvrmse => "Hourly CVRMSE [%]",
            Kpi::DailyAmplitudeCvrmse => "Daily Amplitude CVRMSE [%]",
            Kpi::RSquared => "R squared (coefficient of determination) [-]",
            Kpi::Rmse => "RMSE [-]",
            Kpi::Rmsle => "RMSLE [-]",
        }
    }

    /// Which extreme of this KPI counts as the best agreement.
    pub fn policy(self) -> GradingPolicy {
        match self {
            Kpi::RSquared => GradingPolicy::BestAtMax,
            Kpi::Nmbe
            | Kpi::Cvrmse
            | Kpi::HourlyCvrmse
            | Kpi::DailyAmplitudeCvrmse
            | Kpi::Rmse
            | Kpi::Rmsle => GradingPolicy::BestAtZero,
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetric(pub String);

impl fmt::Display for UnknownMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown metric '{}'", self.0)
    }
}

impl std::error::Error for UnknownMetric {}

impl FromStr for Kpi {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Kpi::ALL
            .into_iter()
            .find(|k| k.label() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

impl Serialize for Kpi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Descriptive statistics of the candidate series alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Minimum,
    Maximum,
    Average,
    StandardDeviation,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Minimum,
        Statistic::Maximum,
        Statistic::Average,
        Statistic::StandardDeviation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Statistic::Minimum => "Minimum",
            Statistic::Maximum => "Maximum",
            Statistic::Average => "Average",
            Statistic::StandardDeviation => "Standard Deviation",
        }
    }
}

/// Rule deciding which extreme of a metric row is the best case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingPolicy {
    /// Closest to zero wins.
    BestAtZero,
    /// Highest wins.
    BestAtMax,
    /// Lowest wins.
    BestAtMin,
}

/// Summary rows appended once grading is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryMetric {
    ErrorGrade,
    AccuracyGrade,
}

impl SummaryMetric {
    pub fn label(self) -> &'static str {
        match self {
            SummaryMetric::ErrorGrade => "Error grade [%]",
            SummaryMetric::AccuracyGrade => "Accuracy grade [%]",
        }
    }
}

/// The metric column of a result-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowLabel {
    Kpi(Kpi),
    Statistic(Statistic),
    Summary(SummaryMetric),
}

impl RowLabel {
    pub fn label(self) -> &'static str {
        match self {
            RowLabel::Kpi(k) => k.label(),
            RowLabel::Statistic(s) => s.label(),
            RowLabel::Summary(s) => s.label(),
        }
    }
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RowLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A column of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseId {
    TestCase,
    Reference,
    Pool(String),
}

impl CaseId {
    pub fn name(&self) -> &str {
        match self {
            CaseId::TestCase => "User Test",
            CaseId::Reference => "Reference",
            CaseId::Pool(name) => name,
        }
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for CaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
