use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart-type tag chosen by the user. The engine passes it through untouched;
/// only the renderer interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    PolarArea,
    Radar,
    Scatter,
    Area,
    Bubble,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::PolarArea => "polar-area",
            ChartType::Radar => "radar",
            ChartType::Scatter => "scatter",
            ChartType::Area => "area",
            ChartType::Bubble => "bubble",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "pie" => Ok(ChartType::Pie),
            "polar-area" | "polarArea" => Ok(ChartType::PolarArea),
            "radar" => Ok(ChartType::Radar),
            "scatter" => Ok(ChartType::Scatter),
            "area" => Ok(ChartType::Area),
            "bubble" => Ok(ChartType::Bubble),
            _ => Err(format!("Unknown chart type '{}'", s)),
        }
    }
}
