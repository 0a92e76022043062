//! Cluster integrands: diagram representation, bond table and value cache.

use std::fmt::Debug;

use virial_core::{BoxGeometry, ErrorInfo, VirialError};

use crate::biconnected::BiconnectedSum;
use crate::diagram::DiagramSum;
use crate::mayer::{Bond, BondTable};

/// Capability of anything that yields a signed integrand for a geometry.
pub trait ClusterIntegrand: Debug + Send {
    /// Number of points the integrand is defined on.
    fn point_count(&self) -> usize;

    /// Current temperature.
    fn temperature(&self) -> f64;

    /// Sets the temperature. Must be called before the first evaluation.
    fn set_temperature(&mut self, temperature: f64) -> Result<(), VirialError>;

    /// Signed integrand value for `geometry`. Non-finite values are returned
    /// as computed.
    fn value(&mut self, geometry: &BoxGeometry<'_>) -> f64;
}

/// How the diagrams of a cluster are represented.
#[derive(Debug, Clone)]
pub enum ClusterDiagram {
    /// Explicit list of bond products.
    Explicit(DiagramSum),
    /// Implicit sum over all biconnected diagrams.
    RecursiveBiconnected(BiconnectedSum),
}

impl ClusterDiagram {
    fn points(&self) -> usize {
        match self {
            ClusterDiagram::Explicit(sum) => sum.points(),
            ClusterDiagram::RecursiveBiconnected(sum) => sum.points(),
        }
    }

    fn evaluate(&mut self, table: &BondTable) -> f64 {
        match self {
            ClusterDiagram::Explicit(sum) => sum.value(table),
            ClusterDiagram::RecursiveBiconnected(sum) => sum.value(table),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CachedValue {
    version: Option<u64>,
    value: f64,
}

/// A cluster diagram bound to its bond functions and temperature.
///
/// Values are cached for the current and the previous geometry version, so
/// a rejected move (which restores the previous version) costs no
/// re-evaluation.
#[derive(Debug, Clone)]
pub struct Cluster {
    diagram: ClusterDiagram,
    bonds: Vec<Bond>,
    table: BondTable,
    temperature: f64,
    beta: f64,
    current: CachedValue,
    last: CachedValue,
}

impl Cluster {
    /// Binds `diagram` to `bonds`. Every bond index referenced by the
    /// diagram must exist. Temperature defaults to 1.
    pub fn new(diagram: ClusterDiagram, bonds: Vec<Bond>) -> Result<Self, VirialError> {
        let needed = match &diagram {
            ClusterDiagram::Explicit(sum) => sum
                .diagrams()
                .iter()
                .flat_map(|d| d.edges.iter().map(|e| e.bond + 1))
                .max()
                .unwrap_or(0),
            ClusterDiagram::RecursiveBiconnected(sum) => sum.bond() + 1,
        };
        if needed > bonds.len() {
            return Err(VirialError::Config(
                ErrorInfo::new("cluster-bonds", "diagram references more bonds than supplied")
                    .with_context("needed", needed.to_string())
                    .with_context("supplied", bonds.len().to_string()),
            ));
        }
        Ok(Self {
            diagram,
            bonds,
            table: BondTable::default(),
            temperature: 1.0,
            beta: 1.0,
            current: CachedValue::default(),
            last: CachedValue::default(),
        })
    }

    /// Recursive biconnected cluster with the virial prefactor over a single f-bond.
    pub fn biconnected(points: usize, f: Bond) -> Result<Self, VirialError> {
        Self::new(
            ClusterDiagram::RecursiveBiconnected(BiconnectedSum::virial(points, 0)?),
            vec![f],
        )
    }

    /// Diagram representation.
    pub fn diagram(&self) -> &ClusterDiagram {
        &self.diagram
    }

    /// Drops both cached values.
    pub fn invalidate(&mut self) {
        self.current = CachedValue::default();
        self.last = CachedValue::default();
    }
}

impl ClusterIntegrand for Cluster {
    fn point_count(&self) -> usize {
        self.diagram.points()
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn set_temperature(&mut self, temperature: f64) -> Result<(), VirialError> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(VirialError::Config(
                ErrorInfo::new("temperature", "temperature must be positive and finite")
                    .with_context("temperature", temperature.to_string()),
            ));
        }
        self.temperature = temperature;
        self.beta = 1.0 / temperature;
        self.invalidate();
        Ok(())
    }

    fn value(&mut self, geometry: &BoxGeometry<'_>) -> f64 {
        if self.current.version == Some(geometry.version) {
            return self.current.value;
        }
        if self.last.version == Some(geometry.version) {
            std::mem::swap(&mut self.current, &mut self.last);
            return self.current.value;
        }
        self.table.fill(&self.bonds, geometry, self.beta);
        let value = self.diagram.evaluate(&self.table);
        self.last = self.current;
        self.current = CachedValue {
            version: Some(geometry.version),
            value,
        };
        value
    }
}
