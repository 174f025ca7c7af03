/// Иконка в формате ARGB32 (порядок байт A, R, G, B), как её ждёт StatusNotifierItem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub width: i32,
    pub height: i32,
    pub argb: Vec<u8>,
}

const SIZE: i32 = 32;
const FRAME: [u8; 4] = [0xff, 0x3a, 0x7b, 0xd5];
const TITLE_BAR: [u8; 4] = [0xff, 0x2a, 0x5d, 0xa8];
const BODY: [u8; 4] = [0xff, 0xf2, 0xf4, 0xf7];
const CLEAR: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

/// Рисует схематичное окно: рамка, заголовок и светлое содержимое
pub fn window_glyph() -> Pixmap {
    let mut argb = Vec::with_capacity((SIZE * SIZE * 4) as usize);

    for y in 0..SIZE {
        for x in 0..SIZE {
            let inside = (2..SIZE - 2).contains(&x) && (4..SIZE - 4).contains(&y);
            let border = x == 2 || x == SIZE - 3 || y == 4 || y == SIZE - 5;
            let pixel = if !inside {
                CLEAR
            } else if border {
                FRAME
            } else if y < 10 {
                TITLE_BAR
            } else {
                BODY
            };
            argb.extend_from_slice(&pixel);
        }
    }

    Pixmap {
        width: SIZE,
        height: SIZE,
        argb,
    }
}
