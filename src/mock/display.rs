use std::io::{self, Write};

use shakmaty::{Bitboard, File, Rank, Square};

use crate::board::BoardState;

/// Render the board with lit LEDs to any writer.
///
/// Pieces are drawn with their FEN letter, lit squares get a yellow
/// background. Without a board only the LEDs are shown.
pub fn render_board(
    w: &mut impl Write,
    board: Option<&BoardState>,
    lit: Bitboard,
) -> io::Result<()> {
    for rank in Rank::ALL.iter().rev() {
        write!(w, " {} ", rank.char())?;
        for file in File::ALL {
            let square = Square::from_coords(file, *rank);
            let symbol = board
                .and_then(|board| board.piece_at(square))
                .map_or('·', |piece| piece.char());
            if lit.contains(square) {
                write!(w, "\x1b[43m {symbol} \x1b[0m")?;
            } else {
                write!(w, " {symbol} ")?;
            }
        }
        writeln!(w)?;
    }
    writeln!(w, "    a  b  c  d  e  f  g  h")?;
    w.flush()
}
