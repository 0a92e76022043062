//! Molecules, the per-ensemble cluster box and its pair-distance table.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, VirialError};

/// Cartesian vector used for every site position.
pub type Vec3 = Vector3<f64>;

/// One interacting body: an ordered list of sites plus an orientation.
///
/// Single-site atoms carry their orientation explicitly (dipoles and other
/// anisotropic sites); for multi-site molecules it tracks the accumulated
/// rigid rotation applied by moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    sites: Vec<Vec3>,
    orientation: UnitQuaternion<f64>,
}

impl Molecule {
    /// Creates a single-site molecule at `position`.
    pub fn atom(position: Vec3) -> Self {
        Self {
            sites: vec![position],
            orientation: UnitQuaternion::identity(),
        }
    }

    /// Creates a multi-site molecule from absolute site positions.
    pub fn from_sites(sites: Vec<Vec3>) -> Result<Self, VirialError> {
        if sites.is_empty() {
            return Err(VirialError::Config(ErrorInfo::new(
                "empty-molecule",
                "a molecule needs at least one site",
            )));
        }
        Ok(Self {
            sites,
            orientation: UnitQuaternion::identity(),
        })
    }

    /// Straight chain of `count` sites spaced `bond_length` apart along x,
    /// starting at `origin`.
    pub fn linear_chain(origin: Vec3, count: usize, bond_length: f64) -> Result<Self, VirialError> {
        let sites = (0..count)
            .map(|k| origin + Vec3::new(k as f64 * bond_length, 0.0, 0.0))
            .collect();
        Self::from_sites(sites)
    }

    /// Site positions in the lab frame.
    pub fn sites(&self) -> &[Vec3] {
        &self.sites
    }

    /// Mutable site positions. Callers are responsible for keeping bond
    /// constraints intact.
    pub fn sites_mut(&mut self) -> &mut [Vec3] {
        &mut self.sites
    }

    /// Number of sites in the molecule.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Accumulated orientation.
    pub fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.orientation
    }

    /// Centroid of the sites, used for centre-centre distances.
    pub fn centre(&self) -> Vec3 {
        let sum: Vec3 = self.sites.iter().sum();
        sum / self.sites.len() as f64
    }

    /// Rigid translation of every site.
    pub fn translate(&mut self, delta: &Vec3) {
        for site in &mut self.sites {
            *site += delta;
        }
    }

    /// Rigid rotation about the centroid, composed into the orientation.
    pub fn rotate(&mut self, rotation: &UnitQuaternion<f64>) {
        let centre = self.centre();
        for site in &mut self.sites {
            *site = centre + rotation * (*site - centre);
        }
        self.orientation = rotation * self.orientation;
    }
}

/// Squared centre-centre distances for every molecule pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PairSet {
    count: usize,
    r2: Vec<f64>,
}

impl PairSet {
    fn rebuild(&mut self, molecules: &[Molecule]) {
        let count = molecules.len();
        self.count = count;
        self.r2.clear();
        self.r2.resize(count * count, 0.0);
        let centres: Vec<Vec3> = molecules.iter().map(Molecule::centre).collect();
        for i in 0..count {
            for j in (i + 1)..count {
                let d2 = (centres[i] - centres[j]).norm_squared();
                self.r2[i * count + j] = d2;
                self.r2[j * count + i] = d2;
            }
        }
    }

    /// Squared distance between molecules `i` and `j`.
    pub fn r2(&self, i: usize, j: usize) -> f64 {
        self.r2[i * self.count + j]
    }

    /// Number of molecules covered by the table.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true when the table covers no molecules.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Borrowed view of a box's current geometry with up-to-date distances.
#[derive(Debug, Clone, Copy)]
pub struct BoxGeometry<'a> {
    /// Molecules in label order.
    pub molecules: &'a [Molecule],
    /// Distances consistent with `molecules`.
    pub pairs: &'a PairSet,
    /// Geometry version the view was taken at.
    pub version: u64,
}

#[derive(Debug, Clone)]
struct Trial {
    previous_version: u64,
    saved: Vec<(usize, Molecule)>,
}

/// Geometry of a single ensemble with a trial commit/revert protocol.
///
/// Every mutation issues a fresh geometry version; reverting a trial
/// restores the version that was current before it, so value caches keyed
/// by version stay valid across rejected moves.
#[derive(Debug, Clone)]
pub struct ClusterBox {
    molecules: Vec<Molecule>,
    version: u64,
    next_version: u64,
    trial: Option<Trial>,
    pairs: PairSet,
    pairs_version: Option<u64>,
}

impl ClusterBox {
    /// Creates a box holding `molecules`. At least one molecule is required.
    pub fn new(molecules: Vec<Molecule>) -> Result<Self, VirialError> {
        if molecules.is_empty() {
            return Err(VirialError::Config(ErrorInfo::new(
                "empty-box",
                "a cluster box needs at least one molecule",
            )));
        }
        Ok(Self {
            molecules,
            version: 0,
            next_version: 1,
            trial: None,
            pairs: PairSet::default(),
            pairs_version: None,
        })
    }

    /// Box of `count` single-site atoms, all at the origin.
    pub fn atoms(count: usize) -> Result<Self, VirialError> {
        Self::new(vec![Molecule::atom(Vec3::zeros()); count])
    }

    /// Number of molecules.
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    /// Returns true if the box holds no molecules (never, after construction).
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Molecules in label order.
    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    /// Molecule with label `index`.
    pub fn molecule(&self, index: usize) -> &Molecule {
        &self.molecules[index]
    }

    /// Current geometry version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether a trial is open.
    pub fn in_trial(&self) -> bool {
        self.trial.is_some()
    }

    fn bump(&mut self) -> u64 {
        let previous = self.version;
        self.version = self.next_version;
        self.next_version += 1;
        previous
    }

    /// Opens a trial. Mutations made through [`ClusterBox::molecule_mut`]
    /// until [`ClusterBox::commit`] or [`ClusterBox::revert`] belong to it.
    pub fn begin_trial(&mut self) {
        if self.trial.is_some() {
            self.revert();
        }
        let previous_version = self.bump();
        self.trial = Some(Trial {
            previous_version,
            saved: Vec::new(),
        });
    }

    /// Mutable access to molecule `index`. Outside a trial the geometry
    /// version advances immediately; inside one the original is saved once.
    pub fn molecule_mut(&mut self, index: usize) -> &mut Molecule {
        match self.trial.as_mut() {
            Some(trial) => {
                if !trial.saved.iter().any(|(saved, _)| *saved == index) {
                    trial.saved.push((index, self.molecules[index].clone()));
                }
            }
            None => {
                self.bump();
            }
        }
        &mut self.molecules[index]
    }

    /// Keeps the trial geometry.
    pub fn commit(&mut self) {
        self.trial = None;
    }

    /// Restores the geometry and version current before the trial.
    pub fn revert(&mut self) {
        if let Some(trial) = self.trial.take() {
            for (index, molecule) in trial.saved.into_iter().rev() {
                self.molecules[index] = molecule;
            }
            self.version = trial.previous_version;
        }
    }

    /// Replaces the whole geometry (seeding) and issues a new version.
    pub fn replace(&mut self, molecules: Vec<Molecule>) -> Result<(), VirialError> {
        if molecules.len() != self.molecules.len() {
            return Err(VirialError::Config(
                ErrorInfo::new("box-size", "replacement geometry has the wrong molecule count")
                    .with_context("expected", self.molecules.len().to_string())
                    .with_context("actual", molecules.len().to_string()),
            ));
        }
        self.trial = None;
        self.molecules = molecules;
        self.bump();
        Ok(())
    }

    /// Geometry view with distances refreshed for the current version.
    pub fn geometry(&mut self) -> BoxGeometry<'_> {
        if self.pairs_version != Some(self.version) {
            self.pairs.rebuild(&self.molecules);
            self.pairs_version = Some(self.version);
        }
        BoxGeometry {
            molecules: &self.molecules,
            pairs: &self.pairs,
            version: self.version,
        }
    }
}
