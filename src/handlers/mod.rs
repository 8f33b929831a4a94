pub mod etudiants;
