//! `kubectl` 바이너리 기반 클러스터 클라이언트
//!
//! [`KubectlClient`]는 [`kubetriage_core::ClusterClient`]의 운영용 구현입니다.
//! 모든 사용자 입력은 [`validation`]을 통과한 뒤에만 명령 인자로 사용됩니다.

pub mod client;
pub mod validation;

pub use client::{KubectlClient, render_events_since};
