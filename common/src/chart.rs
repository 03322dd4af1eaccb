use std::{
    collections::HashMap,
    ffi::OsString,
    fmt::Write as _,
    fs::{self, create_dir_all},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::ChartConfig,
    error::{Error, Result, io_error},
    group::{PlotGroups, Series},
    util::{gnuplot_escape, html_escape, sanitize_label, script_json},
};

/// Sub directory of the output directory holding one chart per plot group.
pub const GROUPS_DIR: &str = "groups";

/// File name used when a chart has no dimensions left to name it by.
const UNNAMED_CHART: &str = "all";

const PLOTLY_URL: &str = "https://cdn.plot.ly/plotly-2.24.1.min.js";

const GNUPLOT_HEADER: &str = r##"# Note you need gnuplot 4.4 for the pdfcairo terminal.
set terminal pdfcairo enhanced font "Helvetica,6" linewidth 1.0 rounded fontscale 1.0

# Axes
set style line 80 lt rgb "#808080"

# Grid
set style line 81 lt 0
set style line 81 lt rgb "#808080"
set style line 81 linewidth 0.5

set grid back linestyle 81

# Only the left and bottom border, in grey
set border 3 back linestyle 80

set xtics nomirror
set ytics nomirror

set style line 1 lt rgb "#A00000" linewidth 2 pointtype 1 pointsize 0.75
set style line 2 lt rgb "#00A000" linewidth 2 pointtype 6 pointsize 0.75
set style line 3 lt rgb "#5060D0" linewidth 2 pointtype 2 pointsize 0.75
set style line 4 lt rgb "#F25900" linewidth 2 pointtype 8 pointsize 0.75
set style line 5 lt rgb "#FF0000" linewidth 2 pointtype 3 pointsize 0.75

set datafile separator ','
set key top left
"##;

#[derive(Debug, Serialize)]
struct PlotlyTrace<'a> {
    name: &'a str,
    x: Vec<i64>,
    y: Vec<f64>,
}

/// A chart written as `<prefix>.gnuplot` (plus one `<prefix>-data-<label>.csv`
/// per series) and `<prefix>.html`.
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub path_prefix: PathBuf,
    pub series: Vec<Series>,
}

impl Chart {
    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut path = OsString::from(self.path_prefix.as_os_str());
        path.push(suffix);
        PathBuf::from(path)
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }

    pub fn data_path(&self, label: &str) -> PathBuf {
        self.with_suffix(&format!("-data-{}.csv", sanitize_label(label)))
    }

    pub fn gnuplot_path(&self) -> PathBuf {
        self.with_suffix(".gnuplot")
    }

    pub fn html_path(&self) -> PathBuf {
        self.with_suffix(".html")
    }

    pub fn render(&self) -> Result<()> {
        self.write_gnuplot()
            .and_then(|_| self.write_html())
            .map_err(|source| Error::Chart {
                chart: self.title.clone(),
                source: Box::new(source),
            })
    }

    fn write_data_csv(&self, path: &Path, series: &Series) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([&self.x_label, &self.y_label])?;
        for point in &series.points {
            writer.write_record([&point.x, &point.y])?;
        }
        writer.flush().map_err(io_error(path))
    }

    /// One data file per series. Labels that sanitize to the same file name
    /// are rejected.
    fn data_paths(&self) -> Result<Vec<PathBuf>> {
        let mut seen: HashMap<PathBuf, &str> = HashMap::new();
        let mut paths = Vec::with_capacity(self.series.len());
        for series in &self.series {
            let path = self.data_path(&series.label);
            if let Some(other) = seen.insert(path.clone(), &series.label) {
                return Err(Error::DuplicateSeries {
                    label: series.label.clone(),
                    other: other.to_owned(),
                    path,
                });
            }
            paths.push(path);
        }
        Ok(paths)
    }

    /// Writes the data files and the gnuplot script that plots them.
    pub fn write_gnuplot(&self) -> Result<()> {
        let data_paths = self.data_paths()?;
        let mut script = String::from(GNUPLOT_HEADER);
        // Writing into a String cannot fail.
        _ = write!(
            script,
            "\nset xlabel \"{}\"\nset ylabel \"{}\"\nset title \"{}\"\nset output \"{}\"\nplot \\\n",
            gnuplot_escape(&self.x_label),
            gnuplot_escape(&self.y_label),
            gnuplot_escape(&self.title),
            Self::file_name(&self.with_suffix(".pdf")),
        );

        for (i, (series, data_path)) in self.series.iter().zip(&data_paths).enumerate() {
            self.write_data_csv(data_path, series)?;
            if i > 0 {
                script.push_str(", \\\n");
            }
            _ = write!(
                script,
                "  \"{}\" using 1:2 with linespoints title \"{}\"",
                Self::file_name(data_path),
                gnuplot_escape(&series.label),
            );
        }
        script.push('\n');

        let path = self.gnuplot_path();
        fs::write(&path, script).map_err(io_error(&path))
    }

    fn traces<'a>(&'a self) -> Result<Vec<PlotlyTrace<'a>>> {
        self.series
            .iter()
            .map(|series| -> Result<PlotlyTrace<'a>> {
                let invalid = |axis, value: &str| Error::InvalidPoint {
                    axis,
                    value: value.to_owned(),
                    series: series.label.clone(),
                };
                let mut trace = PlotlyTrace {
                    name: &series.label,
                    x: Vec::with_capacity(series.points.len()),
                    y: Vec::with_capacity(series.points.len()),
                };
                for point in &series.points {
                    trace
                        .x
                        .push(point.x.parse().map_err(|_| invalid("x", &point.x))?);
                    trace
                        .y
                        .push(point.y.parse().map_err(|_| invalid("y", &point.y))?);
                }
                Ok(trace)
            })
            .collect()
    }

    /// Writes a standalone page that draws the chart with plotly.
    pub fn write_html(&self) -> Result<()> {
        let traces = script_json(&self.traces()?)?;
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title_html}</title>
<script src="{PLOTLY_URL}"></script>
<script>
function onLoad() {{
	var data = {traces};
	var layout = {{
		title: {title},
		xaxis: {{
			title: {x_label},
		}},
		yaxis: {{
			title: {y_label},
		}}
	}};

	Plotly.newPlot("plot", data, layout);
}}
window.addEventListener("load", onLoad);
</script>
</head>
<body>
<div id="plot" style="width: 100%; height: 800px;"></div>
</body>
</html>
"#,
            title_html = html_escape(&self.title),
            title = script_json(&self.title)?,
            x_label = script_json(&self.x_label)?,
            y_label = script_json(&self.y_label)?,
        );
        let path = self.html_path();
        fs::write(&path, html).map_err(io_error(&path))
    }
}

fn chart_name(combined_path: String) -> String {
    if combined_path.is_empty() {
        UNNAMED_CHART.to_owned()
    } else {
        combined_path
    }
}

/// One single series chart per plot group, in `<output_dir>/groups`.
pub fn write_group_charts(
    groups: &PlotGroups,
    config: &ChartConfig,
    output_dir: &Path,
) -> Result<usize> {
    let dir = output_dir.join(GROUPS_DIR);
    create_dir_all(&dir).map_err(io_error(&dir))?;

    for (key, points) in groups.iter() {
        let assignment = groups.dimensions().parse_key(key)?;
        debug!("Rendering group {key}");
        Chart {
            title: assignment.combined(),
            x_label: config.x_axis.clone(),
            y_label: config.y_axis.clone(),
            path_prefix: dir.join(chart_name(assignment.combined_path())),
            series: vec![Series {
                label: config.y_axis.clone(),
                points: points.to_vec(),
            }],
        }
        .render()?;
    }
    Ok(groups.len())
}

/// Charts where the dimension at `excluded` varies and the rest are held
/// constant, in `<output_dir>/<dimension name>`.
pub fn write_pivot_charts(
    groups: &PlotGroups,
    config: &ChartConfig,
    output_dir: &Path,
    excluded: usize,
) -> Result<usize> {
    let name = groups
        .dimensions()
        .names()
        .get(excluded)
        .ok_or_else(|| Error::UnknownDimension(format!("dimension index {excluded}")))?;
    info!("plots where dimension={name} varies and the rest are held constant ...");

    let pivots = groups.pivot(excluded)?;
    info!("  {} groups of plots", pivots.len());

    let dir = output_dir.join(name);
    create_dir_all(&dir).map_err(io_error(&dir))?;
    for pivot in &pivots {
        debug!(
            "Rendering {} with {} series",
            pivot.assignment.combined(),
            pivot.series.len()
        );
        Chart {
            title: pivot.assignment.combined(),
            x_label: config.x_axis.clone(),
            y_label: config.y_axis.clone(),
            path_prefix: dir.join(chart_name(pivot.assignment.combined_path())),
            series: pivot.series.clone(),
        }
        .render()?;
    }
    Ok(pivots.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::DataPoint;

    fn point(x: &str, y: &str) -> DataPoint {
        DataPoint {
            x: x.to_owned(),
            y: y.to_owned(),
        }
    }

    fn chart(dir: &Path, series: Vec<Series>) -> Chart {
        Chart {
            title: "use_buffer=false, connection_type=unix".to_owned(),
            x_label: "read_buffer_bytes".to_owned(),
            y_label: "throughput (MiB/s)".to_owned(),
            path_prefix: dir.join("use_buffer=false_ connection_type=unix"),
            series,
        }
    }

    #[test]
    fn writes_gnuplot_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart(
            dir.path(),
            vec![
                Series {
                    label: "4096".to_owned(),
                    points: vec![point("1", "10.5"), point("2", "20")],
                },
                Series {
                    label: "file_/dev/zero".to_owned(),
                    points: vec![point("1", "99")],
                },
            ],
        );
        chart.render().unwrap();

        let data = fs::read_to_string(
            dir.path()
                .join("use_buffer=false_ connection_type=unix-data-4096.csv"),
        )
        .unwrap();
        assert_eq!(data, "read_buffer_bytes,throughput (MiB/s)\n1,10.5\n2,20\n");
        assert!(
            dir.path()
                .join("use_buffer=false_ connection_type=unix-data-file_-dev-zero.csv")
                .exists()
        );

        let script = fs::read_to_string(chart.gnuplot_path()).unwrap();
        assert!(script.starts_with(GNUPLOT_HEADER));
        assert!(script.contains(r#"set xlabel "read\\\_buffer\\\_bytes""#));
        assert!(script.contains(r#"set output "use_buffer=false_ connection_type=unix.pdf""#));
        assert!(script.contains(
            "plot \\\n  \"use_buffer=false_ connection_type=unix-data-4096.csv\" using 1:2 with linespoints title \"4096\", \\\n"
        ));
        assert!(script.contains(r#"title "file\\\_/dev/zero""#));
    }

    #[test]
    fn writes_html_traces() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart(
            dir.path(),
            vec![Series {
                label: "unix".to_owned(),
                points: vec![point("4096", "40"), point("8192", "80.5")],
            }],
        );
        chart.write_html().unwrap();
        let html = fs::read_to_string(chart.html_path()).unwrap();
        assert!(html.contains(PLOTLY_URL));
        assert!(html.contains(r#"var data = [{"name":"unix","x":[4096,8192],"y":[40.0,80.5]}];"#));
        assert!(html.contains(r#"title: "throughput (MiB/s)","#));
    }

    #[test]
    fn colliding_series_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart(
            dir.path(),
            vec![
                Series {
                    label: "TCP".to_owned(),
                    points: vec![point("1", "10")],
                },
                Series {
                    label: "tcp".to_owned(),
                    points: vec![point("1", "20")],
                },
            ],
        );
        match chart.render().unwrap_err() {
            Error::Chart { source, .. } => assert!(matches!(
                *source,
                Error::DuplicateSeries { ref label, ref other, .. } if label == "tcp" && other == "TCP"
            )),
            err => panic!("unexpected error {err:?}"),
        }
        assert!(!chart.data_path("tcp").exists());
        assert!(!chart.gnuplot_path().exists());
    }

    #[test]
    fn non_numeric_points_fail() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart(
            dir.path(),
            vec![Series {
                label: "unix".to_owned(),
                points: vec![point("4k", "40")],
            }],
        );
        match chart.render().unwrap_err() {
            Error::Chart { source, .. } => assert!(matches!(
                *source,
                Error::InvalidPoint { axis: "x", ref value, .. } if value == "4k"
            )),
            err => panic!("unexpected error {err:?}"),
        }
    }
}
