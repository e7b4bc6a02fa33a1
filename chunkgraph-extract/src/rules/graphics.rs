use std::collections::HashSet;

use crate::decoded::DecodedChunk;
use crate::model::{Reference, ReferenceKind, ResourceNode, SemanticCategory, TypeCode};
use crate::registry::{ExtractContext, ExtractionRule};

use super::local_ref;

/// Drawable groups reference one sprite per image layer.
///
/// The same sprite is usually shared by many (direction, zoom) layers; only
/// the first occurrence becomes an edge.
#[derive(Debug, Default)]
pub struct DrawGroupRule;

impl ExtractionRule for DrawGroupRule {
    fn type_code(&self) -> TypeCode {
        TypeCode::DGRP
    }

    fn name(&self) -> &'static str {
        "draw_group"
    }

    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        let DecodedChunk::DrawGroup(group) = chunk else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut refs = Vec::new();
        for (i, image) in group.images.iter().enumerate() {
            for (k, &sprite_id) in image.sprite_ids.iter().enumerate() {
                if sprite_id == 0 || !seen.insert(sprite_id) {
                    continue;
                }
                refs.push(
                    local_ref(
                        ctx.scopes,
                        &node.id,
                        TypeCode::SPR2,
                        u32::from(sprite_id),
                        ReferenceKind::Hard,
                        SemanticCategory::Visual,
                    )
                    .locus(format!("image[{i}].sprite[{k}]"))
                    .description(format!(
                        "sprite for direction {} zoom {}",
                        image.direction, image.zoom
                    )),
                );
            }
        }
        refs
    }
}

#[derive(Debug, Default)]
pub struct SpriteRule;

impl ExtractionRule for SpriteRule {
    fn type_code(&self) -> TypeCode {
        TypeCode::SPR2
    }

    fn name(&self) -> &'static str {
        "sprite"
    }

    fn extract(
        &self,
        chunk: &DecodedChunk,
        node: &ResourceNode,
        ctx: &ExtractContext<'_>,
    ) -> Vec<Reference> {
        let DecodedChunk::Sprite(sprite) = chunk else {
            return Vec::new();
        };
        if sprite.palette_id == 0 {
            return Vec::new();
        }
        vec![
            local_ref(
                ctx.scopes,
                &node.id,
                TypeCode::PALT,
                u32::from(sprite.palette_id),
                ReferenceKind::Soft,
                SemanticCategory::Visual,
            )
            .locus("field:palette_id")
            .description("palette"),
        ]
    }
}
