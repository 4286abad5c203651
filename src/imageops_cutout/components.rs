use std::collections::BTreeMap;

use image::Luma;
use imageproc::definitions::Image;
use imageproc::map::map_colors;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::ComponentFilterConfig;
use crate::error::ComponentFilterError;

/// Area and centroid of one labelled component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentStats {
    pub label: u32,
    /// Pixel count
    pub area: u64,
    /// Mean (x, y) of the component's pixels
    pub centroid: (f32, f32),
}

/// 8-connected labelling of a thresholded mask
///
/// Label 0 is background; every other label identifies one component.
#[derive(Debug, Clone)]
pub struct ComponentLabelMap {
    labels: Image<Luma<u32>>,
    components: Vec<ComponentStats>,
}

impl ComponentLabelMap {
    /// Labels the pixels of `mask` whose value is strictly above `cutoff`
    #[must_use]
    pub fn from_mask(mask: &Image<Luma<u8>>, cutoff: u8) -> Self {
        let binary = map_colors(mask, |Luma([alpha])| {
            Luma([if alpha > cutoff { u8::MAX } else { 0 }])
        });
        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

        let mut sums: BTreeMap<u32, (u64, f64, f64)> = BTreeMap::new();
        for (x, y, Luma([label])) in labels.enumerate_pixels() {
            if *label == 0 {
                continue;
            }
            let entry = sums.entry(*label).or_insert((0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += f64::from(x);
            entry.2 += f64::from(y);
        }

        let components = sums
            .into_iter()
            .map(|(label, (area, sum_x, sum_y))| ComponentStats {
                label,
                area,
                centroid: (
                    (sum_x / area as f64) as f32,
                    (sum_y / area as f64) as f32,
                ),
            })
            .collect();

        Self { labels, components }
    }

    #[must_use]
    pub const fn labels(&self) -> &Image<Luma<u32>> {
        &self.labels
    }

    /// Components ordered by label
    #[must_use]
    pub fn components(&self) -> &[ComponentStats] {
        &self.components
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The component with the largest area; ties go to the lowest label
    #[must_use]
    pub fn largest(&self) -> Option<&ComponentStats> {
        self.components
            .iter()
            .max_by(|a, b| a.area.cmp(&b.area).then(b.label.cmp(&a.label)))
    }
}

/// Removal of small noise components from an alpha mask
pub trait FilterComponentsExt {
    /// Zeroes every component that sits inside the configured region and is
    /// smaller than the configured minimum area.
    ///
    /// The largest component is always kept. A discarded component is cleared
    /// together with the faint pixels at or below the cutoff that surround it,
    /// unless they also touch a kept component. All other pixels keep their
    /// original alpha. Filtering an already filtered mask with the same
    /// configuration returns it unchanged.
    ///
    /// # Errors
    ///
    /// * `ComponentFilterError::InvalidParameter` - When the region or area
    ///   fraction is out of range
    fn filter_components(&self, config: &ComponentFilterConfig) -> Result<Self, ComponentFilterError>
    where
        Self: Sized;
}

impl FilterComponentsExt for Image<Luma<u8>> {
    fn filter_components(&self, config: &ComponentFilterConfig) -> Result<Self, ComponentFilterError> {
        config.validate()?;

        let (width, height) = self.dimensions();
        let map = ComponentLabelMap::from_mask(self, config.cutoff);
        let Some(primary) = map.largest() else {
            return Ok(self.clone());
        };

        let min_area = config.min_area(width, height);
        let max_label = map.components().last().map_or(0, |c| c.label) as usize;
        let mut discard = vec![false; max_label + 1];
        let mut discarded = 0usize;

        for component in map.components() {
            if component.label == primary.label {
                continue;
            }
            let is_noise = config.keep_largest_only
                || (component.area < min_area
                    && config.region.contains_row(component.centroid.1, height));
            if is_noise {
                discard[component.label as usize] = true;
                discarded += 1;
            }
        }

        tracing::debug!(
            components = map.len(),
            discarded,
            min_area,
            primary_area = primary.area,
            "component filter"
        );

        if discarded == 0 {
            return Ok(self.clone());
        }

        // Regions of the alpha > 0 support that hold only discarded
        // components are cleared, faint skirt included.
        let support = (config.cutoff > 0).then(|| ComponentLabelMap::from_mask(self, 0));
        let regions = support.as_ref().map_or(map.labels(), ComponentLabelMap::labels);
        let region_count = support
            .as_ref()
            .map_or(max_label, |s| s.components().last().map_or(0, |c| c.label) as usize);

        // (holds a discarded component, holds a kept component)
        let mut contents = vec![(false, false); region_count + 1];
        for (Luma([label]), Luma([region])) in map.labels().pixels().zip(regions.pixels()) {
            if *label == 0 {
                continue;
            }
            let entry = &mut contents[*region as usize];
            if discard[*label as usize] {
                entry.0 = true;
            } else {
                entry.1 = true;
            }
        }

        let mut filtered = self.clone();
        for ((pixel, Luma([label])), Luma([region])) in filtered
            .pixels_mut()
            .zip(map.labels().pixels())
            .zip(regions.pixels())
        {
            let (has_discarded, has_kept) = contents[*region as usize];
            if discard[*label as usize] || (has_discarded && !has_kept) {
                *pixel = Luma([0]);
            }
        }

        Ok(filtered)
    }
}
