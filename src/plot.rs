// src/plot.rs

//! Interactive figures for an embedding projected into component space.
//!
//! The figure is a plain Plotly description (`data` + `layout`) built from
//! serde structs. It is written as a standalone HTML page that loads
//! plotly.js and renders the serialized figure.

use csv::WriterBuilder;
use log::{debug, info};
use ndarray::{ArrayView1, ArrayView2};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::alignment::AlignedClinical;
use crate::error::{AnalysisError, Result};
use crate::pca::component_names;

pub const GROUP_LABEL: &str = "Cancer Type";
pub const SAMPLE_LABEL: &str = "Patient ID";

/// Heights of the scatter row and the loading row.
pub const ROW_HEIGHTS: [f64; 2] = [0.7, 0.3];
const VERTICAL_SPACING: f64 = 0.04;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Human-readable names for clinical fields shown in hover text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNames {
    names: BTreeMap<String, String>,
}

impl Default for DisplayNames {
    fn default() -> Self {
        Self::empty()
            .with("gender", "Gender")
            .with("hpv_status", "HPV Status")
            .with("age_at_pathologic_diagnosis", "Age at Diagnosis")
            .with("tobacco_smoking_history", "Smoking History")
            .with("race", "Race")
    }
}

impl DisplayNames {
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, display: &str) -> Self {
        self.names.insert(field.to_string(), display.to_string());
        self
    }

    /// The display name of `field`, or the field itself when none is registered.
    pub fn get<'a>(&'a self, field: &'a str) -> &'a str {
        self.names.get(field).map(String::as_str).unwrap_or(field)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Trace {
    Scatter3d(Scatter3dTrace),
    Line(LineTrace),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Scatter3dTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub legendgroup: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub text: Vec<String>,
    pub hovertemplate: String,
    pub marker: Marker,
    pub scene: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LineTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub xaxis: &'static str,
    pub yaxis: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Marker {
    pub size: f64,
    pub opacity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Domain {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SceneAxis {
    pub title: Title,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Scene {
    pub domain: Domain,
    pub xaxis: SceneAxis,
    pub yaxis: SceneAxis,
    pub zaxis: SceneAxis,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartesianAxis {
    pub domain: [f64; 2],
    pub anchor: &'static str,
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showticklabels: Option<bool>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: Title,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Layout {
    pub scene: Scene,
    pub xaxis: CartesianAxis,
    pub yaxis: CartesianAxis,
    pub legend: Legend,
    pub height: u32,
}

impl Figure {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AnalysisError::Encode {
            what: "plot figure".to_string(),
            message: e.to_string(),
        })
    }

    /// Writes a self-contained HTML page rendering the figure.
    pub fn write_html<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        // A literal "</" would end the inline script early.
        let json = self.to_json()?.replace("</", "<\\/");
        let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        write!(
            writer,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <script src=\"{}\"></script>\n</head>\n<body>\n\
             <div id=\"figure\" style=\"width:100%;height:100vh;\"></div>\n\
             <script>\nvar figure = {};\n\
             Plotly.newPlot(\"figure\", figure.data, figure.layout, {{responsive: true}});\n\
             </script>\n</body>\n</html>\n",
            PLOTLY_JS, json
        )
        .and_then(|_| writer.flush())
        .map_err(|e| AnalysisError::io(path, e))?;
        info!("Wrote figure with {} traces to {}", self.data.len(), path.display());
        Ok(())
    }
}

/// Everything the composer needs about the samples and components.
#[derive(Debug, Clone, Copy)]
pub struct PlotInput<'a> {
    /// samples x components
    pub coordinates: ArrayView2<'a, f64>,
    /// components x pathways
    pub loadings: ArrayView2<'a, f64>,
    pub components: [usize; 3],
    pub sample_ids: &'a [String],
    pub groups: &'a [String],
    pub pathways: &'a [String],
    pub clinical: &'a AlignedClinical,
}

impl PlotInput<'_> {
    fn validate(&self) -> Result<()> {
        let n_samples = self.coordinates.nrows();
        if self.sample_ids.len() != n_samples {
            return Err(AnalysisError::shape(
                "plot coordinates vs sample ids",
                n_samples,
                self.sample_ids.len(),
            ));
        }
        if self.groups.len() != n_samples {
            return Err(AnalysisError::shape(
                "plot coordinates vs groups",
                n_samples,
                self.groups.len(),
            ));
        }
        if self.clinical.values.nrows() != n_samples {
            return Err(AnalysisError::shape(
                "plot coordinates vs aligned clinical rows",
                n_samples,
                self.clinical.values.nrows(),
            ));
        }
        if self.loadings.ncols() != self.pathways.len() {
            return Err(AnalysisError::shape(
                "loading columns vs pathway names",
                self.pathways.len(),
                self.loadings.ncols(),
            ));
        }
        let available = self.coordinates.ncols().min(self.loadings.nrows());
        if let Some(&last) = self.components.iter().max() {
            if last >= available {
                return Err(AnalysisError::ComponentOutOfRange {
                    first: self.components[0],
                    available,
                });
            }
        }
        Ok(())
    }
}

/// Stacks a 3D sample scatter over a loading line plot.
#[derive(Debug, Clone, Default)]
pub struct PlotComposer {
    display_names: DisplayNames,
}

impl PlotComposer {
    pub fn new(display_names: DisplayNames) -> Self {
        Self { display_names }
    }

    pub fn compose(&self, input: &PlotInput<'_>) -> Result<Figure> {
        input.validate()?;
        let names = component_names(input.coordinates.ncols().max(input.loadings.nrows()));
        let [cx, cy, cz] = input.components;
        let hover_text = self.hover_text(input);

        let mut data = Vec::new();
        for (group, members) in groups_in_order(input.groups) {
            let coordinate =
                |c: usize| -> Vec<f64> { members.iter().map(|&i| input.coordinates[[i, c]]).collect() };
            data.push(Trace::Scatter3d(Scatter3dTrace {
                kind: "scatter3d",
                mode: "markers",
                name: group.to_string(),
                legendgroup: group.to_string(),
                x: coordinate(cx),
                y: coordinate(cy),
                z: coordinate(cz),
                text: members.iter().map(|&i| hover_text[i].clone()).collect(),
                hovertemplate: format!(
                    "%{{text}}<br>{}=%{{x}}<br>{}=%{{y}}<br>{}=%{{z}}<extra></extra>",
                    names[cx], names[cy], names[cz]
                ),
                marker: Marker {
                    size: 3.0,
                    opacity: 0.8,
                },
                scene: "scene",
            }));
        }
        let n_scatter = data.len();

        for &component in &input.components {
            data.push(Trace::Line(line_trace(
                &names[component],
                input.loadings.row(component),
                input.pathways,
            )));
        }
        debug!(
            "Composed {} group traces and {} loading traces.",
            n_scatter,
            input.components.len()
        );

        Ok(Figure {
            data,
            layout: stacked_layout(&names[cx], &names[cy], &names[cz]),
        })
    }

    fn hover_text(&self, input: &PlotInput<'_>) -> Vec<String> {
        let labels: Vec<&str> = input
            .clinical
            .fields
            .iter()
            .map(|field| self.display_names.get(field))
            .collect();
        (0..input.sample_ids.len())
            .map(|i| {
                let mut lines = vec![
                    format!("{}: {}", GROUP_LABEL, input.groups[i]),
                    format!("{}: {}", SAMPLE_LABEL, input.sample_ids[i]),
                ];
                for (label, value) in labels.iter().zip(input.clinical.values.row(i)) {
                    lines.push(format!("{}: {}", label, value));
                }
                lines.join("<br>")
            })
            .collect()
    }
}

/// Sample indices per group, groups in order of first appearance.
fn groups_in_order(groups: &[String]) -> Vec<(&str, Vec<usize>)> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut ordered: Vec<(&str, Vec<usize>)> = Vec::new();
    for (idx, group) in groups.iter().enumerate() {
        let position = *slot.entry(group.as_str()).or_insert_with(|| {
            ordered.push((group.as_str(), Vec::new()));
            ordered.len() - 1
        });
        ordered[position].1.push(idx);
    }
    ordered
}

fn line_trace(name: &str, loading: ArrayView1<f64>, pathways: &[String]) -> LineTrace {
    LineTrace {
        kind: "scatter",
        mode: "lines",
        name: name.to_string(),
        x: pathways.to_vec(),
        y: loading.to_vec(),
        xaxis: "x",
        yaxis: "y",
    }
}

fn stacked_layout(x_name: &str, y_name: &str, z_name: &str) -> Layout {
    let split = ROW_HEIGHTS[1];
    let axis = |name: &str| SceneAxis {
        title: Title {
            text: name.to_string(),
        },
    };
    Layout {
        scene: Scene {
            domain: Domain {
                x: [0.0, 1.0],
                y: [split + VERTICAL_SPACING / 2.0, 1.0],
            },
            xaxis: axis(x_name),
            yaxis: axis(y_name),
            zaxis: axis(z_name),
        },
        xaxis: CartesianAxis {
            domain: [0.0, 1.0],
            anchor: "y",
            title: Title {
                text: "Pathway".to_string(),
            },
            showticklabels: Some(false),
        },
        yaxis: CartesianAxis {
            domain: [0.0, split - VERTICAL_SPACING / 2.0],
            anchor: "x",
            title: Title {
                text: "Loading".to_string(),
            },
            showticklabels: None,
        },
        legend: Legend {
            title: Title {
                text: GROUP_LABEL.to_string(),
            },
        },
        height: 1000,
    }
}

/// Writes projected coordinates as a tab-separated table.
///
/// Columns are `SampleID`, `Group` and one `PC i` column per component.
pub fn write_scores_tsv<P: AsRef<Path>>(
    path: P,
    sample_ids: &[String],
    groups: &[String],
    coordinates: ArrayView2<f64>,
) -> Result<()> {
    let path = path.as_ref();
    if sample_ids.len() != coordinates.nrows() || groups.len() != coordinates.nrows() {
        return Err(AnalysisError::shape(
            "score rows vs sample annotations",
            coordinates.nrows(),
            sample_ids.len().min(groups.len()),
        ));
    }
    let tsv_error = |e: csv::Error| AnalysisError::Encode {
        what: path.display().to_string(),
        message: e.to_string(),
    };

    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .map_err(tsv_error)?;
    let mut header = vec!["SampleID".to_string(), "Group".to_string()];
    header.extend(component_names(coordinates.ncols()));
    wtr.write_record(&header).map_err(tsv_error)?;
    for (i, row) in coordinates.outer_iter().enumerate() {
        let mut record = vec![sample_ids[i].clone(), groups[i].clone()];
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record).map_err(tsv_error)?;
    }
    wtr.flush().map_err(|e| AnalysisError::io(path, e))?;
    info!(
        "Wrote {} x {} component scores to {}",
        coordinates.nrows(),
        coordinates.ncols(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use tempfile::tempdir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn clinical() -> AlignedClinical {
        AlignedClinical {
            fields: strings(&["gender", "custom_field"]),
            values: array![
                ["female".to_string(), "x".to_string()],
                ["NA".to_string(), "NA".to_string()],
                ["male".to_string(), "y".to_string()]
            ],
            matched: 2,
            unmatched: 1,
            duplicate_keys: 0,
        }
    }

    fn compose_small(components: [usize; 3]) -> Result<Figure> {
        let coordinates = Array2::from_shape_fn((3, 4), |(i, j)| (i * 10 + j) as f64);
        let loadings = Array2::from_shape_fn((4, 2), |(i, j)| (i + j) as f64 / 10.0);
        let sample_ids = strings(&["p1", "p2", "p3"]);
        let groups = strings(&["LUAD", "BRCA", "LUAD"]);
        let pathways = strings(&["wnt", "p53"]);
        let clinical = clinical();
        let input = PlotInput {
            coordinates: coordinates.view(),
            loadings: loadings.view(),
            components,
            sample_ids: &sample_ids,
            groups: &groups,
            pathways: &pathways,
            clinical: &clinical,
        };
        PlotComposer::default().compose(&input)
    }

    #[test]
    fn one_scatter_trace_per_group_then_three_lines() {
        let figure = compose_small([1, 2, 3]).unwrap();
        assert_eq!(figure.data.len(), 5);
        match &figure.data[0] {
            Trace::Scatter3d(trace) => {
                assert_eq!(trace.name, "LUAD");
                assert_eq!(trace.x, vec![1.0, 21.0]);
                assert_eq!(trace.y, vec![2.0, 22.0]);
                assert_eq!(trace.z, vec![3.0, 23.0]);
                assert!(trace.hovertemplate.contains("PC 2=%{x}"));
            }
            other => panic!("expected scatter trace, got {:?}", other),
        }
        match &figure.data[2] {
            Trace::Line(trace) => {
                assert_eq!(trace.name, "PC 2");
                assert_eq!(trace.x, strings(&["wnt", "p53"]));
                assert_eq!(trace.y, vec![0.1, 0.2]);
            }
            other => panic!("expected line trace, got {:?}", other),
        }
    }

    #[test]
    fn hover_text_uses_display_names() {
        let figure = compose_small([0, 1, 2]).unwrap();
        let Trace::Scatter3d(brca) = &figure.data[1] else {
            panic!("expected scatter trace");
        };
        assert_eq!(
            brca.text[0],
            "Cancer Type: BRCA<br>Patient ID: p2<br>Gender: NA<br>custom_field: NA"
        );
    }

    #[test]
    fn rows_are_stacked() {
        let layout = compose_small([0, 1, 2]).unwrap().layout;
        assert!(layout.scene.domain.y[0] > layout.yaxis.domain[1]);
        assert_eq!(layout.scene.domain.y[1], 1.0);
        assert_eq!(layout.yaxis.domain[0], 0.0);
        assert_eq!(layout.scene.xaxis.title.text, "PC 1");
    }

    #[test]
    fn components_beyond_loadings_are_rejected() {
        assert!(matches!(
            compose_small([2, 3, 4]),
            Err(AnalysisError::ComponentOutOfRange { .. })
        ));
    }

    #[test]
    fn html_embeds_figure_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("figure.html");
        let figure = compose_small([0, 1, 2]).unwrap();
        figure.write_html(&path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains(PLOTLY_JS));
        assert!(html.contains("\"type\":\"scatter3d\""));
        assert!(html.contains("Plotly.newPlot"));
    }

    #[test]
    fn scores_tsv_has_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.tsv");
        write_scores_tsv(
            &path,
            &strings(&["a", "b"]),
            &strings(&["g1", "g2"]),
            array![[0.5, -1.0], [2.0, 0.25]].view(),
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SampleID\tGroup\tPC 1\tPC 2");
        assert_eq!(lines[1], "a\tg1\t0.5\t-1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn unknown_fields_keep_their_name() {
        let names = DisplayNames::default();
        assert_eq!(names.get("hpv_status"), "HPV Status");
        assert_eq!(names.get("tumor_site"), "tumor_site");
    }
}
