// src/lib.rs

// On déclare tous nos modules principaux pour les rendre publics et
// utilisables par nos programmes binaires (replay_runner.rs) et les tests d'intégration.
pub mod config;
pub mod math;
pub mod oracle;
pub mod pools;
pub mod state;
pub mod validation;
pub mod monitoring;
