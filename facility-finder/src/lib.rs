//! Facility proximity search.
//!
//! Finds public facilities (defibrillators, night clinics, shelters) near an
//! origin point: fetches a paginated open-data registry, normalizes its rows,
//! keeps those within a radius sorted by distance, and adds travel times for
//! the nearest few.

pub mod cache;
pub mod config;
pub mod domain;
pub mod enrich;
pub mod kakao;
pub mod lookup;
pub mod normalize;
pub mod proximity;
pub mod registry;
pub mod session;
pub mod web;
