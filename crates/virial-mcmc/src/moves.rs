use std::f64::consts::PI;
use std::fmt::Debug;

use nalgebra::{Unit, UnitQuaternion};
use serde::{Deserialize, Serialize};
use virial_core::{ClusterBox, ErrorInfo, RngHandle, Vec3, VirialError};

use crate::config::{MoveConfig, MoveEntry};
use crate::tracker::StepTracker;

/// Kind of move performed by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    /// Displace one molecule other than molecule 0.
    Translate,
    /// Displace every molecule except molecule 0 independently.
    TranslateAll,
    /// Rotate one molecule rigidly about its centre.
    Rotate,
    /// Move one chain site without changing its bond lengths.
    Wiggle,
    /// Move an end site of a chain to the other end.
    Reptate,
    /// Bend the chain at one interior site.
    AngleBend,
}

impl MoveKind {
    /// Stable label used in reports and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Translate => "translate",
            MoveKind::TranslateAll => "translate-all",
            MoveKind::Rotate => "rotate",
            MoveKind::Wiggle => "wiggle",
            MoveKind::Reptate => "reptate",
            MoveKind::AngleBend => "angle-bend",
        }
    }

    fn minimum_sites(&self) -> usize {
        match self {
            MoveKind::Translate | MoveKind::TranslateAll | MoveKind::Rotate => 1,
            MoveKind::Wiggle | MoveKind::Reptate => 2,
            MoveKind::AngleBend => 3,
        }
    }

    /// `(initial, min, max)` step sizes, or `None` for moves without a step.
    fn step_bounds(&self) -> Option<(f64, f64, f64)> {
        match self {
            MoveKind::Translate | MoveKind::TranslateAll => Some((0.5, 1e-4, 10.0)),
            MoveKind::Rotate | MoveKind::Wiggle => Some((PI / 4.0, 1e-4, PI)),
            MoveKind::AngleBend => Some((0.2, 1e-4, PI / 2.0)),
            MoveKind::Reptate => None,
        }
    }
}

/// A trial perturbation of a box's geometry.
///
/// `propose` mutates the open trial of the box through
/// [`ClusterBox::molecule_mut`] and returns `false` when no candidate could
/// be formed. Every proposal here is symmetric, so acceptance needs only the
/// weight ratio.
pub trait MoveProposal: Debug + Send {
    /// Move type.
    fn kind(&self) -> MoveKind;

    /// Step tracker for this move.
    fn tracker(&self) -> &StepTracker;

    /// Mutable step tracker for this move.
    fn tracker_mut(&mut self) -> &mut StepTracker;

    /// Perturbs the open trial.
    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool;
}

fn random_vector(rng: &mut RngHandle, half_width: f64) -> Vec3 {
    Vec3::new(
        rng.symmetric(half_width),
        rng.symmetric(half_width),
        rng.symmetric(half_width),
    )
}

fn eligible(cluster_box: &ClusterBox, min_sites: usize) -> Vec<usize> {
    (0..cluster_box.len())
        .filter(|&i| cluster_box.molecule(i).site_count() >= min_sites)
        .collect()
}

/// Uniform displacement of a single molecule within a cube of half-width `step`.
#[derive(Debug, Clone)]
pub struct Translate {
    tracker: StepTracker,
}

impl MoveProposal for Translate {
    fn kind(&self) -> MoveKind {
        MoveKind::Translate
    }

    fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool {
        if cluster_box.len() < 2 {
            return false;
        }
        let index = 1 + rng.index(cluster_box.len() - 1);
        let delta = random_vector(rng, self.tracker.step());
        cluster_box.molecule_mut(index).translate(&delta);
        true
    }
}

/// Independent uniform displacement of every molecule but the first.
#[derive(Debug, Clone)]
pub struct TranslateAll {
    tracker: StepTracker,
}

impl MoveProposal for TranslateAll {
    fn kind(&self) -> MoveKind {
        MoveKind::TranslateAll
    }

    fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool {
        if cluster_box.len() < 2 {
            return false;
        }
        let step = self.tracker.step();
        for index in 1..cluster_box.len() {
            let delta = random_vector(rng, step);
            cluster_box.molecule_mut(index).translate(&delta);
        }
        true
    }
}

/// Rigid rotation of one molecule about a random axis.
#[derive(Debug, Clone)]
pub struct Rotate {
    tracker: StepTracker,
}

impl MoveProposal for Rotate {
    fn kind(&self) -> MoveKind {
        MoveKind::Rotate
    }

    fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool {
        let index = rng.index(cluster_box.len());
        let rotation = rng.small_rotation(self.tracker.step());
        cluster_box.molecule_mut(index).rotate(&rotation);
        true
    }
}

/// Moves one site of a chain, keeping every bond length.
///
/// Interior sites rotate about the axis through their two neighbours; end
/// sites rotate about their single neighbour.
#[derive(Debug, Clone)]
pub struct Wiggle {
    tracker: StepTracker,
}

impl MoveProposal for Wiggle {
    fn kind(&self) -> MoveKind {
        MoveKind::Wiggle
    }

    fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool {
        let candidates = eligible(cluster_box, 2);
        if candidates.is_empty() {
            return false;
        }
        let index = candidates[rng.index(candidates.len())];
        let site_count = cluster_box.molecule(index).site_count();
        let site = rng.index(site_count);
        let step = self.tracker.step();
        let sites = cluster_box.molecule(index).sites();
        let moved = if site == 0 || site == site_count - 1 {
            let pivot = if site == 0 { sites[1] } else { sites[site_count - 2] };
            let rotation = rng.small_rotation(step);
            pivot + rotation * (sites[site] - pivot)
        } else {
            let before = sites[site - 1];
            let axis = sites[site + 1] - before;
            let axis = match Unit::try_new(axis, 1e-12) {
                Some(axis) => axis,
                None => return false,
            };
            let rotation = UnitQuaternion::from_axis_angle(&axis, rng.symmetric(step));
            before + rotation * (sites[site] - before)
        };
        cluster_box.molecule_mut(index).sites_mut()[site] = moved;
        true
    }
}

/// Removes one end site of a chain and regrows it at the other end, one
/// bond length away in a uniformly random direction.
#[derive(Debug, Clone)]
pub struct Reptate {
    tracker: StepTracker,
}

impl MoveProposal for Reptate {
    fn kind(&self) -> MoveKind {
        MoveKind::Reptate
    }

    fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool {
        let candidates = eligible(cluster_box, 2);
        if candidates.is_empty() {
            return false;
        }
        let index = candidates[rng.index(candidates.len())];
        let forward = rng.uniform() < 0.5;
        let direction = rng.unit_vector();
        let molecule = cluster_box.molecule_mut(index);
        let sites = molecule.sites_mut();
        if !forward {
            sites.reverse();
        }
        let bond = (sites[1] - sites[0]).norm();
        let head = sites[sites.len() - 1] + direction.into_inner() * bond;
        sites.rotate_left(1);
        let last = sites.len() - 1;
        sites[last] = head;
        if !forward {
            sites.reverse();
        }
        true
    }
}

/// Rotates the tail of a chain rigidly about one interior site, changing
/// the bond angle there and leaving every bond length intact.
#[derive(Debug, Clone)]
pub struct AngleBend {
    tracker: StepTracker,
}

impl MoveProposal for AngleBend {
    fn kind(&self) -> MoveKind {
        MoveKind::AngleBend
    }

    fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut StepTracker {
        &mut self.tracker
    }

    fn propose(&mut self, cluster_box: &mut ClusterBox, rng: &mut RngHandle) -> bool {
        let candidates = eligible(cluster_box, 3);
        if candidates.is_empty() {
            return false;
        }
        let index = candidates[rng.index(candidates.len())];
        let site_count = cluster_box.molecule(index).site_count();
        let vertex = 1 + rng.index(site_count - 2);
        let rotation = rng.small_rotation(self.tracker.step());
        let tail_forward = rng.uniform() < 0.5;
        let sites = cluster_box.molecule_mut(index).sites_mut();
        let pivot = sites[vertex];
        let tail = if tail_forward {
            vertex + 1..site_count
        } else {
            0..vertex
        };
        for site in tail {
            sites[site] = pivot + rotation * (sites[site] - pivot);
        }
        true
    }
}

/// Step settings of `entry` with absent values filled from the move's
/// defaults, as `(initial, min, max)`. `None` for moves without a step.
///
/// Rejects bounds that are not positive and finite, an inverted range, and
/// an initial step outside `(0, inf)`.
pub fn resolve_step_bounds(entry: &MoveEntry) -> Result<Option<(f64, f64, f64)>, VirialError> {
    let Some((initial, min, max)) = entry.kind.step_bounds() else {
        return Ok(None);
    };
    let step = entry.step.unwrap_or(initial);
    let min_step = entry.min_step.unwrap_or(min);
    let max_step = entry.max_step.unwrap_or(max);
    let invalid = |code: &str, message: &str, value: String| -> Result<Option<(f64, f64, f64)>, VirialError> {
        Err(VirialError::Config(
            ErrorInfo::new(code, message)
                .with_context("move", entry.kind.as_str())
                .with_context("value", value),
        ))
    };
    if !(step.is_finite() && step > 0.0) {
        return invalid("move-step", "initial step must be positive and finite", step.to_string());
    }
    if !(min_step.is_finite() && max_step.is_finite() && min_step > 0.0 && min_step <= max_step) {
        return invalid(
            "move-step-bounds",
            "step bounds must satisfy 0 < min_step <= max_step",
            format!("{min_step}..{max_step}"),
        );
    }
    Ok(Some((step, min_step, max_step)))
}

/// Builds the proposal for `entry` with the tuning parameters of `config`.
pub fn build_move(entry: &MoveEntry, config: &MoveConfig) -> Result<Box<dyn MoveProposal>, VirialError> {
    let tracker = match resolve_step_bounds(entry)? {
        Some((step, min_step, max_step)) => StepTracker::new(
            step,
            min_step,
            max_step,
            config.target_acceptance,
            config.adjust_interval,
        ),
        None => StepTracker::fixed(),
    };
    Ok(match entry.kind {
        MoveKind::Translate => Box::new(Translate { tracker }),
        MoveKind::TranslateAll => Box::new(TranslateAll { tracker }),
        MoveKind::Rotate => Box::new(Rotate { tracker }),
        MoveKind::Wiggle => Box::new(Wiggle { tracker }),
        MoveKind::Reptate => Box::new(Reptate { tracker }),
        MoveKind::AngleBend => Box::new(AngleBend { tracker }),
    })
}

/// Ordered move registry with frequency-weighted selection.
#[derive(Debug)]
pub struct MoveSet {
    moves: Vec<Box<dyn MoveProposal>>,
    cumulative: Vec<f64>,
}

impl MoveSet {
    /// Builds the registry from configuration, rejecting moves that no
    /// molecule in `cluster_box` can undergo.
    pub fn from_config(config: &MoveConfig, cluster_box: &ClusterBox) -> Result<Self, VirialError> {
        let mut set = Self {
            moves: Vec::new(),
            cumulative: Vec::new(),
        };
        for entry in &config.entries {
            if eligible(cluster_box, entry.kind.minimum_sites()).is_empty() {
                return Err(VirialError::Config(
                    ErrorInfo::new("move-inapplicable", "no molecule can undergo this move")
                        .with_context("move", entry.kind.as_str())
                        .with_context("min_sites", entry.kind.minimum_sites().to_string()),
                ));
            }
            set.push(build_move(entry, config)?, entry.frequency)?;
        }
        Ok(set)
    }

    /// Registers `proposal` with relative `frequency`.
    pub fn push(&mut self, proposal: Box<dyn MoveProposal>, frequency: f64) -> Result<(), VirialError> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(VirialError::Config(
                ErrorInfo::new("move-frequency", "move frequencies must be positive")
                    .with_context("move", proposal.kind().as_str())
                    .with_context("frequency", frequency.to_string()),
            ));
        }
        let total = self.cumulative.last().copied().unwrap_or(0.0) + frequency;
        self.moves.push(proposal);
        self.cumulative.push(total);
        Ok(())
    }

    /// Number of registered moves.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Whether no move is registered.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Draws a move index weighted by frequency.
    pub fn select(&self, rng: &mut RngHandle) -> usize {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        let draw = rng.uniform() * total;
        self.cumulative
            .iter()
            .position(|&edge| draw < edge)
            .unwrap_or(self.moves.len().saturating_sub(1))
    }

    /// Move at `index`.
    pub fn get_mut(&mut self, index: usize) -> &mut dyn MoveProposal {
        self.moves[index].as_mut()
    }

    /// Registered moves in order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn MoveProposal> {
        self.moves.iter().map(|m| m.as_ref())
    }

    /// Turns step tuning on or off for every move.
    pub fn set_tuning(&mut self, tuning: bool) {
        for proposal in &mut self.moves {
            proposal.tracker_mut().set_tuning(tuning);
        }
    }
}
