use crate::{
    error::{LectureVideoError, Result},
    types::{SlideImage, SlideScript},
};

/// Equalizes the script and page lists before per-slide work:
///
/// - fewer scripts than pages: the missing scripts are empty (silent slides);
/// - fewer pages than scripts: the last page is repeated.
///
/// Both returned lists have `max(scripts.len(), images.len())` entries.
pub fn reconcile(
    mut scripts: Vec<SlideScript>,
    mut images: Vec<SlideImage>,
) -> Result<(Vec<SlideScript>, Vec<SlideImage>)> {
    let Some(last_image) = images.last().cloned() else {
        return Err(LectureVideoError::RasterizationFailed {
            reason: "no page images to pair with scripts".to_string(),
        });
    };

    let count = scripts.len().max(images.len());
    scripts.resize_with(count, SlideScript::default);
    images.resize(count, last_image);

    Ok((scripts, images))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(n: u8) -> Vec<SlideImage> {
        (0..n).map(|i| SlideImage::new(vec![i])).collect()
    }

    fn scripts(n: usize) -> Vec<SlideScript> {
        (0..n).map(|i| SlideScript::new(format!("slide {i}"))).collect()
    }

    #[test]
    fn short_image_list_repeats_last_page() {
        let (s, i) = reconcile(scripts(5), images(3)).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(i.len(), 5);
        assert_eq!(i[2].bytes(), &[2]);
        assert_eq!(i[3].bytes(), &[2]);
        assert_eq!(i[4].bytes(), &[2]);
    }

    #[test]
    fn short_script_list_is_padded_with_empty_text() {
        let (s, i) = reconcile(scripts(3), images(5)).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(i.len(), 5);
        assert_eq!(s[2].text, "slide 2");
        assert!(s[3].text.is_empty());
        assert!(s[4].text.is_empty());
    }

    #[test]
    fn equal_lengths_are_untouched() {
        let (s, i) = reconcile(scripts(2), images(2)).unwrap();
        assert_eq!(s, scripts(2));
        assert_eq!(i, images(2));
    }

    #[test]
    fn no_scripts_means_one_silent_slide_per_page() {
        let (s, i) = reconcile(Vec::new(), images(2)).unwrap();
        assert_eq!(s, vec![SlideScript::default(); 2]);
        assert_eq!(i.len(), 2);
    }

    #[test]
    fn no_images_is_fatal() {
        assert!(reconcile(scripts(2), Vec::new()).is_err());
    }
}
